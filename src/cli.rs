use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use legal_docgen::client::{DocumentSession, GenerationClient, HttpTransport, StreamSnapshot};
use legal_docgen::core::{AppConfig, GenerationError};
use legal_docgen::generators::{download_name, print_view, PdfGenerator};
use legal_docgen::templates::{categories, Category, DocumentTemplate, FieldKind, FormData, TemplateRegistry, NOT_FOUND_MESSAGE};

fn cli() -> Command {
    Command::new("docgen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Draft legal documents from templates")
        .subcommand_required(true)
        .subcommand(Command::new("categories").about("List document categories"))
        .subcommand(
            Command::new("list")
                .about("List document templates")
                .arg(
                    Arg::new("category")
                        .long("category")
                        .help("Category id: litigation, contract or family"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .short('s')
                        .help("Substring of name, description or category label"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show the form fields of a template")
                .arg(Arg::new("id").required(true).help("Template id")),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate a document, streaming it to stdout")
                .arg(Arg::new("id").required(true).help("Template id"))
                .arg(
                    Arg::new("form")
                        .long("form")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON object of field values"),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .action(ArgAction::Append)
                        .help("Field value as name=value (repeatable)"),
                )
                .arg(
                    Arg::new("revise")
                        .long("revise")
                        .action(ArgAction::Append)
                        .help("Follow-up instruction applied after generation (repeatable)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the final document to this file"),
                )
                .arg(Arg::new("endpoint").long("endpoint").help("Generation service URL")),
        )
        .subcommand(
            Command::new("export")
                .about("Export a document text file")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Plain text document"),
                )
                .arg(Arg::new("title").long("title").help("Document title"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("pdf")
                        .value_parser(["pdf", "print"])
                        .help("pdf or print (HTML)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output path, defaults to <title>.<ext>"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AppConfig::load()?;
    let registry = TemplateRegistry::builtin();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("categories", _)) => {
            for info in categories() {
                println!("{:<12} {}  {}", info.id.id(), info.label, info.description);
            }
        }
        Some(("list", args)) => {
            let category = match args.get_one::<String>("category") {
                Some(id) => Some(Category::parse(id).with_context(|| format!("unknown category: {id}"))?),
                None => None,
            };
            let search = args.get_one::<String>("search").map(String::as_str);

            let templates = registry.filter(category, search);
            if templates.is_empty() {
                println!("没有找到匹配的文书类型");
            }
            for template in templates {
                println!("{:<20} {}  [{}] {}", template.id, template.name, template.category_label, template.description);
            }
        }
        Some(("show", args)) => {
            let template = find_or_exit(registry, args);
            print_fields(template);
        }
        Some(("generate", args)) => {
            let template = find_or_exit(registry, args);
            generate(&config, template, args).await?;
        }
        Some(("export", args)) => export(&config, args).await?,
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

fn find_or_exit(registry: &'static TemplateRegistry, args: &ArgMatches) -> &'static DocumentTemplate {
    let id = args.get_one::<String>("id").map(String::as_str).unwrap_or_default();
    match registry.find(id) {
        Some(template) => template,
        None => {
            eprintln!("{NOT_FOUND_MESSAGE}: {id}");
            eprintln!("返回首页: docgen list");
            std::process::exit(1);
        }
    }
}

fn print_fields(template: &DocumentTemplate) {
    println!("{} ({})", template.name, template.id);
    println!("{}", template.description);
    println!();
    for field in &template.fields {
        let marker = if field.required { "*" } else { " " };
        let kind = match &field.kind {
            FieldKind::Text => "text".to_string(),
            FieldKind::Textarea => "textarea".to_string(),
            FieldKind::Select { options } => format!("select: {}", options.join(" / ")),
        };
        println!("{marker} {:<20} {}  ({kind})", field.name, field.label);
        if !field.placeholder.is_empty() {
            println!("    {}", field.placeholder);
        }
    }
}

fn read_form(args: &ArgMatches) -> Result<FormData> {
    let mut form = match args.get_one::<PathBuf>("form") {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => FormData::new(),
    };

    for pair in args.get_many::<String>("set").into_iter().flatten() {
        let (name, value) = pair
            .split_once('=')
            .with_context(|| format!("expected name=value, got {pair}"))?;
        form.set_field(name, value);
    }

    Ok(form)
}

/// Echoes text to stdout as it streams in. A text that no longer extends the
/// previous one (a follow-up reset) starts on a fresh line.
fn spawn_printer(mut updates: watch::Receiver<StreamSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shown = String::new();
        while updates.changed().await.is_ok() {
            let text = updates.borrow_and_update().text.clone();
            let mut out = std::io::stdout().lock();
            match text.strip_prefix(shown.as_str()) {
                Some(suffix) => {
                    let _ = out.write_all(suffix.as_bytes());
                }
                None => {
                    let _ = writeln!(out, "\n");
                    let _ = out.write_all(text.as_bytes());
                }
            }
            let _ = out.flush();
            shown = text;
        }
    })
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

fn report_failure(err: &GenerationError) -> ! {
    tracing::debug!(error = %err, "generation failed");
    eprintln!("\n{}", err.user_message());
    std::process::exit(1);
}

async fn generate(config: &AppConfig, template: &DocumentTemplate, args: &ArgMatches) -> Result<()> {
    let form = read_form(args)?;
    let endpoint = args
        .get_one::<String>("endpoint")
        .cloned()
        .unwrap_or_else(|| config.client.endpoint.clone());

    let transport = HttpTransport::new(endpoint, config.client.api_key.clone());
    let client = GenerationClient::new(transport).with_max_pending(config.stream.max_pending_bytes);
    let mut session = DocumentSession::new(client, template.clone());
    for (name, value) in form.iter() {
        session.set_field(name, value);
    }

    let printer = spawn_printer(session.client().subscribe());
    let cancel = cancel_on_ctrl_c();

    match session.submit(&cancel).await {
        Ok(outcome) if outcome.is_cancelled() => eprintln!("\n已停止生成"),
        Ok(_) => {}
        Err(e) => report_failure(&e),
    }

    if !cancel.is_cancelled() {
        for instruction in args.get_many::<String>("revise").into_iter().flatten() {
            match session.revise(instruction, &cancel).await {
                Ok(outcome) if outcome.is_cancelled() => {
                    eprintln!("\n已停止生成");
                    break;
                }
                Ok(_) => {}
                Err(e) => report_failure(&e),
            }
        }
    }

    let document = session.document().to_string();
    drop(session);
    let _ = printer.await;
    println!();

    if let Some(path) = args.get_one::<PathBuf>("output") {
        tokio::fs::write(path, &document)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("已保存到 {}", path.display());
    }

    Ok(())
}

async fn export(config: &AppConfig, args: &ArgMatches) -> Result<()> {
    let input = args.get_one::<PathBuf>("input").context("input is required")?;
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let title = args
        .get_one::<String>("title")
        .cloned()
        .or_else(|| text.lines().next().map(|l| l.trim().to_string()))
        .unwrap_or_default();
    let format = args.get_one::<String>("format").map(String::as_str).unwrap_or("pdf");

    let (bytes, extension) = match format {
        "print" => (print_view(&text, &title)?.into_bytes(), "html"),
        _ => (PdfGenerator::new(&config.export).generate(&text, &title).await?, "pdf"),
    };

    let output = args
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(download_name(&title, extension)));
    tokio::fs::write(&output, bytes)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}
