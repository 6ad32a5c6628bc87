use minijinja::{context, Environment};

use crate::core::ExportError;

const PRINT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{{ title }}</title>
  <style>
    body {
      font-family: "SimSun", "宋体", serif;
      padding: 60px 80px;
      font-size: 14px;
      line-height: 1.8;
      color: #000;
    }
    @media print {
      body { padding: 0; }
    }
    pre {
      white-space: pre-wrap;
      word-wrap: break-word;
      font-family: inherit;
      font-size: inherit;
      line-height: inherit;
    }
  </style>
</head>
<body>
  <pre>{{ text }}</pre>
  <script>window.onload = function() { window.print(); }</script>
</body>
</html>
"#;

/// Standalone print page that opens the browser's print dialog on load.
pub fn print_view(text: &str, title: &str) -> Result<String, ExportError> {
    let mut env = Environment::new();
    // the .html name turns on HTML auto-escaping
    env.add_template("print.html", PRINT_TEMPLATE)?;

    let html = env
        .get_template("print.html")?
        .render(context! { title => title, text => text })?;
    Ok(html)
}
