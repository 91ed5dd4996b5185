// tests/config_files.rs
use std::path::PathBuf;

use serial_test::serial;
use tender_radar::relevance::ENV_PROFILE_PATH;
use tender_radar::{PipelineConfig, RelevanceScorer, ScoringProfile};

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

#[test]
fn shipped_pipeline_config_matches_builtin() {
    let cfg = PipelineConfig::load_from(&shipped("radar.toml")).expect("radar.toml");
    assert_eq!(cfg, PipelineConfig::default());
}

#[test]
fn shipped_profile_matches_builtin() {
    let text = std::fs::read_to_string(shipped("profile.toml")).expect("profile.toml");
    let p = ScoringProfile::from_toml_str(&text).expect("parse");
    assert_eq!(p, ScoringProfile::default());
}

#[test]
#[serial]
fn profile_path_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narrow.toml");
    std::fs::write(&path, "keywords = [\"needs assessment\"]\n[weights]\nkeyword_per_hit = 25\n")
        .unwrap();

    std::env::set_var(ENV_PROFILE_PATH, &path);
    let p = ScoringProfile::from_toml();
    std::env::remove_var(ENV_PROFILE_PATH);

    let p = p.expect("profile from env path");
    assert_eq!(p.weights.keyword_per_hit, 25);
    assert_eq!(p.weights.keyword_cap, 40);
    let s = RelevanceScorer::new(&p);
    assert!(s.has_keyword("Needs assessment of rural clinics"));
    assert!(!s.has_keyword("Baseline survey"));
}

#[test]
#[serial]
fn missing_env_profile_is_an_error() {
    std::env::set_var(ENV_PROFILE_PATH, "/definitely/not/here.toml");
    let res = ScoringProfile::from_toml();
    std::env::remove_var(ENV_PROFILE_PATH);
    assert!(res.is_err());
}
