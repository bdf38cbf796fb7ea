use clap::Parser;
use snapdex::{
    DataDir,
    Document,
    FieldKind,
    IndexService,
    Operation,
    Predicate,
    SearchPage,
    ServiceConfig,
    SortSpec,
    error,
    seed,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{
    Cli,
    Command,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("SNAPDEX_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config = ServiceConfig::load(&data_dir.config_file())?;
    if !data_dir.has_index() {
        info!(path = %data_dir.index_dir().display(), "creating new index");
    }
    let service = IndexService::open(&data_dir.index_dir(), &config)?;

    match cli.command {
        Command::Seed(args) => {
            let docs = seed::numbered_documents(1..=args.count);
            let receipt = service.upsert(docs)?;
            println!(
                "Upserted {} documents (generation {})",
                receipt.applied, receipt.generation
            );
        }
        Command::Upsert(args) => {
            cmd_upsert(&service, &config, &args)?;
        }
        Command::Delete { id } => {
            service.apply_batch(&[Operation::Delete { id: id.clone() }])?;
            println!("Deleted '{id}'");
        }
        Command::Search(args) => {
            let sort = args.sort.as_deref().map(|field| {
                if args.desc {
                    SortSpec::desc(field)
                } else {
                    SortSpec::asc(field)
                }
            });
            let page = service.search_text(
                &args.query,
                &args.field,
                args.page,
                args.page_size,
                sort,
            )?;

            if args.json {
                println!("{}", serde_json::to_string(&page)?);
            } else {
                format_human(&page, &config.schema.id_field);
            }
        }
        Command::Count(args) => {
            let count = service.count(&Predicate::parse(&args.query, &args.field))?;
            println!("{count}");
        }
        Command::Status(args) => {
            cmd_status(&service, &data_dir, args.json)?;
        }
    }

    Ok(())
}

fn cmd_upsert(
    service: &IndexService,
    config: &ServiceConfig,
    args: &cli::UpsertArgs,
) -> error::Result<()> {
    let schema = &config.schema;
    let mut doc = Document::new().with(&schema.id_field, args.id.as_str());

    for (name, value) in &args.fields {
        let kind = schema.field(name).map(|def| def.kind).ok_or_else(|| {
            error::Error::InvalidDocument(format!("unknown field '{name}'"))
        })?;
        if kind == FieldKind::U64 {
            let n: u64 = value.parse().map_err(|_| {
                error::Error::InvalidDocument(format!(
                    "field '{name}' expects a number, got '{value}'"
                ))
            })?;
            doc.push(name, n);
        } else {
            doc.push(name, value.as_str());
        }
    }

    let receipt = service.upsert(vec![doc])?;
    println!("Upserted '{}' (generation {})", args.id, receipt.generation);
    Ok(())
}

fn cmd_status(
    service: &IndexService,
    data_dir: &DataDir,
    json: bool,
) -> error::Result<()> {
    use snapdex::engine::SnapshotView;

    let snapshot = service.snapshot();
    let docs = snapshot.num_docs();
    let fields: Vec<&str> = service
        .schema()
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "data_dir": data_dir.root(),
                "data_dir_origin": data_dir.origin(),
                "generation": snapshot.generation(),
                "documents": docs,
                "fields": fields,
            })
        );
    } else {
        println!(
            "Data directory: {} (from {})",
            data_dir.root().display(),
            data_dir.origin().describe()
        );
        println!("Documents: {docs}");
        println!("Fields: {}", fields.join(", "));
    }
    Ok(())
}

fn format_human(page: &SearchPage, id_field: &str) {
    if page.documents.is_empty() {
        println!("No results found.");
        return;
    }

    for doc in &page.documents {
        let id = doc.text(id_field).unwrap_or("?");
        let rest: Vec<String> = doc
            .fields()
            .filter(|(name, _)| *name != id_field)
            .map(|(name, value)| match value {
                snapdex::FieldValue::Text(s) => format!("{name}={s}"),
                snapdex::FieldValue::U64(v) => format!("{name}={v}"),
            })
            .collect();
        println!("{id}\t{}", rest.join("  "));
    }
    println!(
        "\n{} of {} match(es)",
        page.documents.len(),
        page.total_matches
    );
}
