//! Library integration tests.

use depprov::{ChangePolicy, DepprovError};

#[test]
fn error_types_are_public() {
    let err = DepprovError::LookupFailed {
        name: "numpy".into(),
        message: "No module named 'numpy'".into(),
    };
    assert!(err.to_string().contains("numpy"));
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> depprov::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn change_policy_is_parsed_from_strings() {
    assert_eq!("store-diff".parse::<ChangePolicy>().unwrap(), ChangePolicy::StoreDiff);
    assert!(matches!(
        "keep".parse::<ChangePolicy>(),
        Err(DepprovError::UnsupportedChangePolicy { .. })
    ));
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use depprov::cli::{Cli, Commands, OutputFormat};

    let cli = Cli::parse_from(["depprov", "find", "run.py", "--format", "json"]);

    if let Commands::Find(args) = cli.command {
        assert_eq!(args.format, OutputFormat::Json);
    } else {
        panic!("Expected Find command");
    }
}

#[test]
fn heuristics_can_be_extended_from_outside_the_crate() {
    use depprov::heuristics::{HeuristicChain, Outcome, VersionHeuristic};
    use depprov::module::LoadedModule;
    use depprov::vcs::VersionControlProbe;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FromName;

    impl VersionHeuristic for FromName {
        fn name(&self) -> &str {
            "from-name"
        }

        fn attempt(&self, module: &LoadedModule) -> Outcome {
            match module.name.split_once('_') {
                Some((_, version)) => Outcome::Resolved(version.to_string()),
                None => Outcome::NotApplicable,
            }
        }
    }

    let chain = HeuristicChain::standard(VersionControlProbe::new(Vec::new()));
    let extra: Vec<Arc<dyn VersionHeuristic>> = vec![Arc::new(FromName)];

    assert_eq!(chain.resolve(&LoadedModule::new("lib_4"), &extra).unwrap(), "4");
    assert_eq!(chain.resolve(&LoadedModule::new("lib"), &extra).unwrap(), "unknown");
}

#[test]
fn config_round_trips_through_files() {
    use depprov::config::{load_merged_config, CONFIG_DIR};
    use std::fs;
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(CONFIG_DIR);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), "vcs:\n  backends: [git]\n  timeout_secs: 5\n").unwrap();
    fs::write(dir.join("config.local.yml"), "vcs:\n  timeout_secs: 10\n").unwrap();

    let settings = load_merged_config(temp.path()).unwrap();

    assert_eq!(settings.vcs.timeout_secs, 10);
    let names: Vec<_> = settings.vcs_probe().backends().iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["git"]);
}
