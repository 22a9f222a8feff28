//! `pixmark-cli`: export and import datasets for a native project file.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};
    use std::process::ExitCode;

    use pixmark::EditorConfig;
    use pixmark::format::formats::YoloFormat;
    use pixmark::format::{
        AnnotationFormat, ExportOptions, FormatError, FormatRegistry, ImportOptions, ProjectData, load_zip,
        save_zip,
    };

    const USAGE: &str = "\
Usage:
  pixmark-cli [--config <file>] export <project.json> <out.zip> [--format <id>] [--strict]
  pixmark-cli [--config <file>] import <project.json> <dataset.zip> [--classes-only]
  pixmark-cli [--config <file>] import-classes <project.json> <classes.txt>";

    #[derive(Debug, thiserror::Error)]
    enum CliError {
        #[error("{0}")]
        Usage(String),

        #[error("Unknown format '{0}'")]
        UnknownFormat(String),

        #[error(transparent)]
        Format(#[from] FormatError),

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    struct Args {
        config: Option<PathBuf>,
        command: String,
        positional: Vec<String>,
        format: Option<String>,
        strict: bool,
        classes_only: bool,
    }

    fn parse_args(raw: impl Iterator<Item = String>) -> Result<Args, CliError> {
        let mut config = None;
        let mut format = None;
        let mut strict = false;
        let mut classes_only = false;
        let mut rest = Vec::new();

        let mut raw = raw.skip(1);
        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--config" => {
                    let path = raw
                        .next()
                        .ok_or_else(|| CliError::Usage("--config needs a path".into()))?;
                    config = Some(PathBuf::from(path));
                }
                "--format" => {
                    format = Some(
                        raw.next()
                            .ok_or_else(|| CliError::Usage("--format needs an id".into()))?,
                    );
                }
                "--strict" => strict = true,
                "--classes-only" => classes_only = true,
                "-h" | "--help" => return Err(CliError::Usage("help requested".into())),
                _ => rest.push(arg),
            }
        }

        let mut rest = rest.into_iter();
        let command = rest
            .next()
            .ok_or_else(|| CliError::Usage("missing command".into()))?;
        Ok(Args {
            config,
            command,
            positional: rest.collect(),
            format,
            strict,
            classes_only,
        })
    }

    fn two_paths(args: &Args) -> Result<(&Path, &Path), CliError> {
        match args.positional.as_slice() {
            [a, b] => Ok((Path::new(a), Path::new(b))),
            _ => Err(CliError::Usage(format!(
                "'{}' takes exactly two paths",
                args.command
            ))),
        }
    }

    fn load_config(path: Option<&Path>) -> EditorConfig {
        match path.map(Path::to_path_buf).or_else(EditorConfig::default_path) {
            Some(path) => EditorConfig::load_or_default(&path),
            None => EditorConfig::default(),
        }
    }

    fn export(args: &Args, config: &EditorConfig) -> Result<(), CliError> {
        let (project, out) = two_paths(args)?;
        let model = ProjectData::load(project)?.to_model()?;
        let registry = FormatRegistry::new();
        let id = args.format.as_deref().unwrap_or("yolo");
        let format = registry
            .get(id)
            .ok_or_else(|| CliError::UnknownFormat(id.to_string()))?;

        let options = ExportOptions::from_settings(&config.export).strict(
            config.export.strict || args.strict,
        );
        let result = format.export(&model, &options)?;
        for warning in &result.warnings {
            log::warn!("{}", warning.message);
        }
        save_zip(&result.dataset, out)?;
        println!(
            "Exported {} annotations from {} images ({} skipped) to {}",
            result.annotations_exported,
            result.images_exported,
            result.skipped.len(),
            out.display()
        );
        Ok(())
    }

    fn import(args: &Args) -> Result<(), CliError> {
        let (project, archive) = two_paths(args)?;
        let mut model = ProjectData::load(project)?.to_model()?;
        let dataset = load_zip(archive)?;
        let options = ImportOptions::new().classes_only(args.classes_only);
        let result = YoloFormat.import(&dataset, &mut model, &options)?;
        for warning in &result.warnings {
            log::warn!("{}", warning.message);
        }
        ProjectData::from_model(&model).save(project)?;
        println!(
            "Imported {} new categories ({} reused) and {} annotations",
            result.categories_created, result.categories_reused, result.annotations_imported
        );
        Ok(())
    }

    fn import_classes(args: &Args) -> Result<(), CliError> {
        let (project, classes) = two_paths(args)?;
        let mut model = ProjectData::load(project)?.to_model()?;
        let names = pixmark::format::formats::parse_class_list(&std::fs::read(classes)?)?;
        let mut result = pixmark::format::ImportResult::new();
        pixmark::format::formats::import_classes(&names, &mut model, &mut result)?;
        ProjectData::from_model(&model).save(project)?;
        println!(
            "{} classes: {} new, {} already present",
            names.len(),
            result.categories_created,
            result.categories_reused
        );
        Ok(())
    }

    fn run(args: Args) -> Result<(), CliError> {
        let config = load_config(args.config.as_deref());
        env_logger::Builder::new()
            .filter_level(config.preferences.log_level.to_level_filter())
            .parse_default_env()
            .init();

        match args.command.as_str() {
            "export" => export(&args, &config),
            "import" => import(&args),
            "import-classes" => import_classes(&args),
            other => Err(CliError::Usage(format!("unknown command '{}'", other))),
        }
    }

    pub fn main() -> ExitCode {
        let result = parse_args(std::env::args()).and_then(run);
        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(CliError::Usage(message)) => {
                eprintln!("{}\n\n{}", message, USAGE);
                ExitCode::from(2)
            }
            Err(e) => {
                log::error!("{}", e);
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

// The library is used directly on wasm; there is no command line there
#[cfg(target_arch = "wasm32")]
fn main() {}
