use crate::catalog::ProjectCatalog;
use crate::detector::FrameworkDetector;
use crate::error::Error;
use crate::extractor::django::DjangoExtractor;
use crate::extractor::flask::FlaskExtractor;
use crate::extractor::RouteExtractor;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::{AstParser, ParsedFile};
use crate::resolver::ModuleResolver;
use crate::scanner::FileScanner;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::walker::Walker;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Files tried, in order, when a Flask endpoint is given as a directory.
const FLASK_ENTRY_FILES: [&str; 4] = ["app.py", "main.py", "wsgi.py", "__init__.py"];

/// Generate an OpenAPI document from a Django or Flask project without running it
#[derive(Parser, Debug)]
#[command(name = "openapi-from-python")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Root URL configuration or application file, or a directory containing one
    #[arg(short = 'e', long = "endpoint", value_name = "PATH")]
    pub endpoint: PathBuf,

    /// Output file path
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: PathBuf,

    /// Project root used to resolve absolute module names
    #[arg(short = 'r', long = "project-root", value_name = "DIR", default_value = ".")]
    pub project_root: PathBuf,

    /// Web framework of the project (if not specified, auto-detect)
    #[arg(short = 'w', long = "framework", value_enum)]
    pub framework: Option<Framework>,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Server URL written to the document (default depends on the framework)
    #[arg(long = "base-path", value_name = "URL")]
    pub base_path: Option<String>,

    /// Extra directory to search when resolving modules (repeatable)
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Derive component schemas and request/response bodies from Django models
    #[arg(long = "infer-schemas")]
    pub infer_schemas: bool,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Supported web frameworks
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Framework {
    /// Django URL configurations, including REST framework routers
    Django,
    /// Flask applications and blueprints
    Flask,
}

impl Framework {
    /// Server URL used when `--base-path` is not given.
    pub fn default_base_path(self) -> &'static str {
        match self {
            Framework::Django => "/proxy/django",
            Framework::Flask => "/proxy/flask",
        }
    }

    fn extractor(self) -> Box<dyn RouteExtractor> {
        match self {
            Framework::Django => Box::new(DjangoExtractor),
            Framework::Flask => Box::new(FlaskExtractor),
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.endpoint.exists() {
        return Err(Error::InvalidArgument(format!(
            "Endpoint path does not exist: {}",
            args.endpoint.display()
        ))
        .into());
    }

    if !args.project_root.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Project root is not a directory: {}",
            args.project_root.display()
        ))
        .into());
    }

    info!("Endpoint: {}", args.endpoint.display());
    info!("Project root: {}", args.project_root.display());
    info!("Output: {} ({:?})", args.output_path.display(), args.output_format);
    match args.framework {
        Some(framework) => info!("Framework: {:?}", framework),
        None => info!("Framework: auto-detect"),
    }

    Ok(args)
}

/// Picks the root file when the endpoint is a directory.
///
/// # Errors
///
/// Fails if the directory has none of the files the framework expects.
pub fn resolve_entry(endpoint: &Path, framework: Framework) -> Result<PathBuf> {
    if endpoint.is_file() {
        return Ok(endpoint.to_path_buf());
    }

    let candidates: &[&str] = match framework {
        Framework::Django => &["urls.py"],
        Framework::Flask => &FLASK_ENTRY_FILES,
    };
    candidates
        .iter()
        .map(|name| endpoint.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} contains none of {} for {:?}",
                endpoint.display(),
                candidates.join(", "),
                framework
            ))
            .into()
        })
}

/// Determines the framework from the entry file, falling back to the whole project.
///
/// # Errors
///
/// Fails when neither the entry nor the project imports exactly one supported framework.
pub fn detect_framework(endpoint: &Path, project_root: &Path) -> Result<Framework> {
    if endpoint.is_file() {
        match AstParser::parse_file(endpoint) {
            Ok(parsed) => {
                if let Some(framework) = FrameworkDetector::detect(&[parsed]).single() {
                    info!("Detected {:?} from {}", framework, endpoint.display());
                    return Ok(framework);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    info!("Detecting framework from project imports...");
    let scan = FileScanner::new(project_root.to_path_buf()).scan()?;
    let candidates: Vec<PathBuf> = scan
        .python_files
        .into_iter()
        .filter(|path| {
            fs::read_to_string(path)
                .map(|source| source.contains("django") || source.contains("flask"))
                .unwrap_or(false)
        })
        .collect();
    let parsed_files: Vec<ParsedFile> = AstParser::parse_files(&candidates)
        .into_iter()
        .filter_map(|parsed| parsed.ok())
        .collect();

    let detection = FrameworkDetector::detect(&parsed_files);
    match detection.single() {
        Some(framework) => Ok(framework),
        None if detection.frameworks.is_empty() => anyhow::bail!(
            "No supported web framework detected. Please specify one using --framework.\n\
             Supported frameworks: django, flask"
        ),
        None => anyhow::bail!(
            "Found both {:?}; please choose one using --framework",
            detection.frameworks
        ),
    }
}

/// Runs the analysis and returns the document without writing it.
pub fn generate(args: &CliArgs) -> Result<OpenApiDocument> {
    // Step 1: framework and root file
    let framework = match args.framework {
        Some(framework) => framework,
        None => detect_framework(&args.endpoint, &args.project_root)?,
    };
    let entry = resolve_entry(&args.endpoint, framework)?;
    info!("Root file: {}", entry.display());

    // Step 2: project-wide ViewSets and models
    info!("Indexing project classes...");
    let catalog = ProjectCatalog::build(&args.project_root)
        .with_context(|| format!("Failed to index {}", args.project_root.display()))?;
    info!(
        "Indexed {} ViewSets and {} models",
        catalog.viewsets.len(),
        catalog.models.len()
    );

    // Step 3: walk the include graph
    info!("Extracting routes...");
    let resolver = ModuleResolver::new(&args.project_root, &entry, &args.search_paths);
    let mut walker = Walker::new(framework.extractor(), resolver, &catalog);
    let routes = walker.walk(&entry, "");
    info!(
        "Extracted {} routes from {} files",
        routes.len(),
        walker.visited_count()
    );
    if routes.is_empty() {
        warn!("No routes found in the project");
    }

    // Step 4: assemble
    let title = match framework {
        Framework::Django => "DjangoApp".to_string(),
        Framework::Flask => walker.app_name().unwrap_or("FlaskApp").to_string(),
    };
    let base_path = args
        .base_path
        .as_deref()
        .unwrap_or(framework.default_base_path());

    info!("Building OpenAPI document...");
    let schema_gen = args.infer_schemas.then(|| SchemaGenerator::new(&catalog));
    let mut builder = OpenApiBuilder::new()
        .with_info(title, "1.0.0".to_string(), None)
        .with_base_path(base_path);
    for route in &routes {
        builder.add_route(route, schema_gen.as_ref());
    }
    if let Some(generator) = &schema_gen {
        builder.add_synthetic_endpoints(generator);
    }
    if builder.duplicates() > 0 {
        debug!("Dropped {} duplicate routes", builder.duplicates());
    }

    Ok(builder.build(schema_gen.as_ref()))
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let document = generate(&args)?;

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Json => serialize_json(&document)?,
        OutputFormat::Yaml => serialize_yaml(&document)?,
    };
    write_to_file(&content, &args.output_path)?;

    println!("Found {} routes", document.operation_count());
    println!("OpenAPI spec written to {}", args.output_path.display());
    Ok(())
}
