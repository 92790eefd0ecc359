//! Data command handlers

use crate::commands::{FixtureArgs, GenerateArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Printer;
use sondeo::data::TestDataManager;
use std::io::Write;
use std::path::PathBuf;

fn data_dir(config: &CliConfig, explicit: Option<&PathBuf>) -> CliResult<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.clone()),
        None => Ok(config.suite_config()?.data_dir),
    }
}

/// Generate records, printing them or saving them to the data directory
pub fn execute_generate(
    config: &CliConfig,
    args: &GenerateArgs,
    printer: &Printer,
    out: &mut dyn Write,
) -> CliResult<()> {
    let manager = TestDataManager::new(data_dir(config, args.data_dir.as_ref())?);
    let manager = match args.seed {
        Some(seed) => manager.with_seed(seed),
        None => manager,
    };
    let generated = manager.generate(args.kind.into(), args.count);

    match args.save {
        Some(ref name) => {
            let path = manager.save_records(name, &generated)?;
            printer.success(&format!(
                "saved {} record(s) to {}",
                generated.len(),
                path.display()
            ));
        }
        None => {
            serde_json::to_writer_pretty(&mut *out, &generated)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Print a fixture file as pretty JSON
pub fn execute_fixture(
    config: &CliConfig,
    args: &FixtureArgs,
    out: &mut dyn Write,
) -> CliResult<()> {
    let manager = TestDataManager::new(data_dir(config, args.data_dir.as_ref())?);
    let fixture = manager.load_fixture(&args.name)?;
    serde_json::to_writer_pretty(&mut *out, fixture.as_ref())?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::KindArg;
    use serde_json::Value;

    fn generate_args(dir: &std::path::Path, kind: KindArg, count: usize) -> GenerateArgs {
        GenerateArgs {
            kind,
            count,
            seed: Some(3),
            save: None,
            data_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn test_generate_prints_array_or_object() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        execute_generate(
            &CliConfig::new(),
            &generate_args(dir.path(), KindArg::User, 3),
            &Printer::default(),
            &mut out,
        )
        .unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);

        let mut out = Vec::new();
        execute_generate(
            &CliConfig::new(),
            &generate_args(dir.path(), KindArg::Order, 1),
            &Printer::default(),
            &mut out,
        )
        .unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert!(value["items"].is_array());
    }

    #[test]
    fn test_generate_save_then_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = generate_args(dir.path(), KindArg::Product, 2);
        args.save = Some("products".to_string());
        let mut out = Vec::new();
        execute_generate(&CliConfig::new(), &args, &Printer::default(), &mut out).unwrap();
        assert!(out.is_empty());
        assert!(dir.path().join("products.json").exists());

        let fixture = FixtureArgs {
            name: "products".to_string(),
            data_dir: Some(dir.path().to_path_buf()),
        };
        execute_fixture(&CliConfig::new(), &fixture, &mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = FixtureArgs {
            name: "absent".to_string(),
            data_dir: Some(dir.path().to_path_buf()),
        };
        let err = execute_fixture(&CliConfig::new(), &fixture, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("absent"));
    }
}
