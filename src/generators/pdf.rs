use std::path::PathBuf;
use std::process::Command;
use uuid::Uuid;

use crate::core::{ExportConfig, ExportError};

const FALLBACK_TITLE: &str = "法律文书";

/// Quotes `raw` as a Typst string literal so no markup in it is interpreted.
fn typst_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Typst source for a paged document: one paragraph per line, the first
/// non-empty line as a centered bold heading.
pub fn page_document(text: &str, title: &str) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("#set document(title: {})\n", typst_string(title)));
    doc.push_str("#set page(paper: \"a4\", margin: (x: 2.5cm, y: 2.5cm))\n");
    doc.push_str("#set text(font: \"SimSun\", size: 12pt, lang: \"zh\")\n");
    doc.push_str("#set par(spacing: 6pt)\n\n");

    for (i, line) in text.split('\n').enumerate() {
        if i == 0 && !line.trim().is_empty() {
            doc.push_str(&format!(
                "#align(center, text(size: 16pt, weight: \"bold\", {}))\n\n",
                typst_string(line)
            ));
        } else if line.trim().is_empty() {
            doc.push_str("#v(6pt)\n\n");
        } else {
            doc.push_str(&format!("#{}\n\n", typst_string(line)));
        }
    }

    doc
}

/// File name offered for a download.
pub fn download_name(title: &str, extension: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { FALLBACK_TITLE } else { title };
    format!("{title}.{extension}")
}

/// Renders documents to PDF through the Typst CLI.
#[derive(Debug, Clone)]
pub struct PdfGenerator {
    typst_bin: String,
    temp_dir: PathBuf,
}

impl PdfGenerator {
    pub fn new(config: &ExportConfig) -> Self {
        PdfGenerator {
            typst_bin: config.typst_bin.clone(),
            temp_dir: PathBuf::from(&config.temp_dir),
        }
    }

    pub async fn generate(&self, text: &str, title: &str) -> Result<Vec<u8>, ExportError> {
        self.compile_typst_to_pdf(&page_document(text, title)).await
    }

    async fn compile_typst_to_pdf(&self, typst_content: &str) -> Result<Vec<u8>, ExportError> {
        let temp_id = Uuid::new_v4();
        let typ_path = self.temp_dir.join(format!("docgen_{temp_id}.typ"));
        let pdf_path = self.temp_dir.join(format!("docgen_{temp_id}.pdf"));

        tokio::fs::write(&typ_path, typst_content).await?;

        let output = tokio::task::spawn_blocking({
            let bin = self.typst_bin.clone();
            let typ_path = typ_path.clone();
            let pdf_path = pdf_path.clone();
            move || Command::new(bin).arg("compile").arg(&typ_path).arg(&pdf_path).output()
        })
        .await;

        let result = match output {
            Err(join) => Err(ExportError::Compile(join.to_string())),
            Ok(Err(io)) => Err(ExportError::Io(io)),
            Ok(Ok(output)) if !output.status.success() => Err(ExportError::Compile(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Ok(Ok(_)) => tokio::fs::read(&pdf_path).await.map_err(ExportError::from),
        };

        let _ = tokio::fs::remove_file(&typ_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        match &result {
            Ok(bytes) => tracing::debug!(size = bytes.len(), "compiled pdf"),
            Err(e) => tracing::error!(error = %e, "pdf export failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_line_is_centered_heading() {
        let doc = page_document("民事起诉状\n原告：张三", "民事起诉状");

        assert!(doc.contains("#set text(font: \"SimSun\", size: 12pt"));
        assert!(doc.contains("#align(center, text(size: 16pt, weight: \"bold\", \"民事起诉状\"))"));
        assert!(doc.contains("#\"原告：张三\"\n"));
    }

    #[test]
    fn leading_blank_line_is_not_a_heading() {
        let doc = page_document("\n正文", "t");
        assert!(!doc.contains("#align(center"));
        assert!(doc.contains("#v(6pt)"));
    }

    #[test]
    fn markup_characters_are_quoted() {
        let doc = page_document("标题\n#let x = \"a\\b\" *粗* $1$", "t");
        assert!(doc.contains(r##"#"#let x = \"a\\b\" *粗* $1$""##));
    }

    #[test]
    fn download_name_falls_back_for_blank_title() {
        assert_eq!(download_name("借款合同", "pdf"), "借款合同.pdf");
        assert_eq!(download_name("  ", "pdf"), "法律文书.pdf");
    }

    #[tokio::test]
    async fn missing_compiler_is_reported_and_cleaned_up() {
        let temp_dir = std::env::temp_dir().join(format!("docgen-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_dir).unwrap();

        let generator = PdfGenerator::new(&ExportConfig {
            typst_bin: "docgen-no-such-typst-binary".into(),
            temp_dir: temp_dir.to_string_lossy().into_owned(),
        });

        let err = generator.generate("正文", "标题").await.unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(std::fs::read_dir(&temp_dir).unwrap().count(), 0);

        std::fs::remove_dir_all(&temp_dir).unwrap();
    }
}
