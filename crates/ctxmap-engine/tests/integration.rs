//! End-to-end tests: discover → extract → rank → select → render on temp repos.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ctxmap_core::{MapConfig, MapError};
use ctxmap_engine::language::LanguageRegistry;
use ctxmap_engine::tokens::{CharEstimate, TokenCounter};
use ctxmap_engine::walker::ExclusionReason;
use ctxmap_engine::{FindRequest, MapRequest, RepoMapper, NO_DEFINITIONS, NO_SUPPORTED_FILES};

const MODELS: &str = "\
class User:
    def __init__(self, name):
        self.name = name
";

const UTILS: &str = "\
def format_name(name):
    return name.title()
";

const MAIN: &str = "\
from models import User
from utils import format_name


def main():
    user = User(format_name(\"ada\"))
    admin = User(\"root\")
    return user, admin
";

fn make_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn make_python_repo() -> tempfile::TempDir {
    make_repo(&[
        ("main.py", MAIN),
        ("utils.py", UTILS),
        ("models.py", MODELS),
    ])
}

fn make_mapper(root: &Path) -> RepoMapper {
    RepoMapper::new(root, Arc::new(LanguageRegistry::with_defaults())).unwrap()
}

fn chat(files: &[&str]) -> BTreeSet<String> {
    files.iter().map(|f| f.to_string()).collect()
}

fn map_with(mapper: &RepoMapper, request: MapRequest) -> String {
    mapper.get_repo_map(&request).unwrap().0
}

#[test]
fn chat_file_ranks_first_and_generous_budget_covers_all_files() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let map = map_with(
        &mapper,
        MapRequest {
            chat_fnames: chat(&["main.py"]),
            max_tokens: Some(10_000),
            ..MapRequest::default()
        },
    );

    assert!(map.starts_with("main.py:\n(Rank value: "), "{map}");
    for file in ["main.py:", "utils.py:", "models.py:"] {
        assert!(map.contains(file), "missing {file} in:\n{map}");
    }
    assert!(map.contains("│def main():"), "{map}");
    assert!(map.contains("│class User:"), "{map}");
    assert!(map.contains("│def format_name(name):"), "{map}");
}

#[test]
fn tight_budget_keeps_a_strict_subset_led_by_the_chat_file() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());
    let request = |max_tokens| MapRequest {
        chat_fnames: chat(&["main.py"]),
        max_tokens: Some(max_tokens),
        ..MapRequest::default()
    };

    let full = map_with(&mapper, request(10_000));
    let full_tokens = CharEstimate.count_tokens(&full);
    let tight = map_with(&mapper, request(full_tokens - 1));

    assert!(!tight.is_empty());
    assert!(tight.len() < full.len(), "{tight}");
    assert!(tight.starts_with("main.py:"), "{tight}");
    assert!(CharEstimate.count_tokens(&tight) < full_tokens);

    let present = ["main.py:", "utils.py:", "models.py:"]
        .iter()
        .filter(|f| tight.contains(*f))
        .count();
    assert!(present < 3, "{tight}");
}

#[test]
fn maps_are_deterministic() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());
    let request = MapRequest {
        chat_fnames: chat(&["main.py"]),
        mentioned_idents: chat(&["User"]),
        max_tokens: Some(40),
        ..MapRequest::default()
    };

    let first = mapper.get_repo_map(&request).unwrap();
    let second = mapper.get_repo_map(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn larger_budgets_never_show_fewer_lines() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let mut previous = 0;
    for budget in [0, 5, 15, 25, 35, 50, 80, 1000] {
        let map = map_with(
            &mapper,
            MapRequest {
                max_tokens: Some(budget),
                ..MapRequest::default()
            },
        );
        assert!(CharEstimate.count_tokens(&map) <= budget, "budget {budget}:\n{map}");

        let shown = map.matches('│').count();
        assert!(shown >= previous, "budget {budget} showed {shown} < {previous}");
        previous = shown;
    }
    assert!(previous > 0);
}

#[test]
fn zero_budget_renders_empty_map() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());
    let map = map_with(
        &mapper,
        MapRequest {
            max_tokens: Some(0),
            ..MapRequest::default()
        },
    );
    assert_eq!(map, "");
}

#[test]
fn configured_budget_applies_when_request_has_none() {
    let repo = make_python_repo();
    let mut config = MapConfig::default();
    config.map.max_map_tokens = 0;
    let mapper = make_mapper(repo.path()).with_config(config).unwrap();

    assert_eq!(map_with(&mapper, MapRequest::default()), "");
}

#[test]
fn invalid_config_is_rejected() {
    let repo = make_python_repo();
    let mut config = MapConfig::default();
    config.ranking.chat_seed_weight = -0.5;

    let result = make_mapper(repo.path()).with_config(config);
    assert!(matches!(result, Err(MapError::Config(msg)) if msg.contains("chat_seed_weight")));
}

#[test]
fn custom_token_counter_is_used() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path()).with_token_counter(|text: &str| text.lines().count());

    let map = map_with(
        &mapper,
        MapRequest {
            max_tokens: Some(6),
            ..MapRequest::default()
        },
    );
    assert!(!map.is_empty());
    assert!(map.lines().count() <= 6, "{map}");
}

#[test]
fn find_user_returns_definition_and_references() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let nav = mapper
        .find_symbol(
            "User",
            &FindRequest {
                source_file: Some(PathBuf::from("main.py")),
                ..FindRequest::default()
            },
        )
        .unwrap();

    assert!(nav.found());
    assert_eq!(nav.kind, "class");
    assert_eq!(nav.definitions.len(), 1);
    assert_eq!(nav.definitions[0].file, "models.py");
    assert_eq!(nav.definitions[0].line, 1);
    assert_eq!(nav.definitions[0].snippet, "class User:");

    let ref_files: BTreeSet<&str> = nav.references.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(ref_files, BTreeSet::from(["main.py"]));
    let mut ref_lines: Vec<usize> = nav.references.iter().map(|r| r.line).collect();
    ref_lines.sort_unstable();
    assert_eq!(ref_lines, vec![1, 6, 7]);

    let text = nav.render(true);
    assert!(text.contains("Symbol      : User (class)"), "{text}");
    assert!(text.contains("Source file : main.py"), "{text}");
    assert!(text.contains("models.py:\n│class User:"), "{text}");
}

#[test]
fn missing_symbol_is_not_an_error() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let nav = mapper.find_symbol("Ghost", &FindRequest::default()).unwrap();
    assert!(!nav.found());
    assert!(nav.definitions.is_empty());
    assert!(nav.references.is_empty());
    assert_eq!(nav.render(true), "Symbol 'Ghost' not found.");
}

#[test]
fn find_symbols_resolves_many_names_at_once() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());
    let names = vec![
        "format_name".to_string(),
        "User".to_string(),
        "Ghost".to_string(),
    ];

    let result = mapper.find_symbols(&names, &FindRequest::default()).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.found_symbols(), vec!["format_name", "User"]);
    assert_eq!(result.not_found_symbols(), vec!["Ghost"]);
    assert_eq!(result.get("format_name").unwrap().kind, "function");

    let text = result.render(false);
    assert!(text.contains("Symbols found (2/3):"), "{text}");
    assert!(text.contains("Definitions (2 total, 2 files)"), "{text}");
}

#[test]
fn find_excludes_skip_files() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let nav = mapper
        .find_symbol(
            "User",
            &FindRequest {
                excludes: vec!["models.py".to_string()],
                ..FindRequest::default()
            },
        )
        .unwrap();
    assert!(nav.definitions.is_empty());
    assert!(nav.references.iter().all(|r| r.file == "main.py"));
    assert!(!nav.references.is_empty());
}

#[test]
fn files_outside_the_root_keep_distinct_sections() {
    let repo = make_repo(&[("keep.py", "def keep():\n    pass\n")]);
    let outside = make_repo(&[
        ("x/m.py", "def alpha():\n    pass\n"),
        ("y/m.py", "def beta():\n    pass\n"),
    ]);
    let mapper = make_mapper(repo.path());

    let map = map_with(
        &mapper,
        MapRequest {
            paths: vec![outside.path().join("x/m.py"), outside.path().join("y/m.py")],
            max_tokens: Some(10_000),
            ..MapRequest::default()
        },
    );
    assert!(map.contains("def alpha"), "{map}");
    assert!(map.contains("def beta"), "{map}");

    let headers: Vec<&str> = map.lines().filter(|l| l.ends_with("m.py:")).collect();
    assert_eq!(headers.len(), 2, "{map}");
    assert_ne!(headers[0], headers[1]);
}

#[test]
fn excludes_remove_files_from_the_map() {
    let repo = make_repo(&[
        ("main.py", MAIN),
        ("utils.py", UTILS),
        ("models.py", MODELS),
        ("vendor/lib.py", "def vendored():\n    pass\n"),
    ]);
    let mapper = make_mapper(repo.path());

    let map = map_with(
        &mapper,
        MapRequest {
            excludes: vec!["utils.py".to_string()],
            max_tokens: Some(10_000),
            ..MapRequest::default()
        },
    );
    assert!(!map.contains("utils.py"), "{map}");
    assert!(!map.contains("vendored"), "{map}");
    assert!(map.contains("models.py:"), "{map}");
}

#[test]
fn explicit_paths_limit_the_scan() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let map = map_with(
        &mapper,
        MapRequest {
            paths: vec![PathBuf::from("models.py")],
            max_tokens: Some(10_000),
            ..MapRequest::default()
        },
    );
    assert!(map.starts_with("models.py:"), "{map}");
    assert!(!map.contains("main.py"), "{map}");
}

#[test]
fn unsupported_files_only() {
    let repo = make_repo(&[("README.md", "# Hello\n"), ("notes.txt", "todo\n")]);
    let mapper = make_mapper(repo.path());

    let (map, report) = mapper.get_repo_map(&MapRequest::default()).unwrap();
    assert_eq!(map, NO_SUPPORTED_FILES);
    assert_eq!(report.total_files_considered, 2);
    assert_eq!(
        report.excluded.get("README.md"),
        Some(&ExclusionReason::UnsupportedLanguage)
    );
}

#[test]
fn files_without_definitions() {
    let repo = make_repo(&[("script.py", "print('hi')\n")]);
    let mapper = make_mapper(repo.path());

    let (map, report) = mapper.get_repo_map(&MapRequest::default()).unwrap();
    assert_eq!(map, NO_DEFINITIONS);
    assert_eq!(report.definition_matches, 0);
    assert_eq!(report.reference_matches, 1);
}

#[test]
fn report_records_soft_exclusions() {
    let repo = make_repo(&[
        ("models.py", MODELS),
        ("blob.py", "\0\0\0binary"),
        ("docs/guide.md", "# Guide\n"),
    ]);
    let mapper = make_mapper(repo.path());

    let (map, report) = mapper.get_repo_map(&MapRequest::default()).unwrap();
    assert!(map.contains("models.py:"), "{map}");
    assert_eq!(report.total_files_considered, 3);
    assert_eq!(report.excluded["blob.py"], ExclusionReason::DecodeError);
    assert_eq!(report.excluded["docs/guide.md"], ExclusionReason::UnsupportedLanguage);
    assert_eq!(report.definition_matches, 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["excluded"]["blob.py"], "decode error");
    assert_eq!(json["totalFilesConsidered"], 3);
}

#[test]
fn oversized_files_are_excluded() {
    let repo = make_repo(&[("models.py", MODELS)]);
    let mut config = MapConfig::default();
    config.map.max_file_size = 8;
    let mapper = make_mapper(repo.path()).with_config(config).unwrap();

    let (map, report) = mapper.get_repo_map(&MapRequest::default()).unwrap();
    assert_eq!(map, NO_SUPPORTED_FILES);
    assert_eq!(report.excluded["models.py"], ExclusionReason::TooLarge);
}

#[test]
fn mixed_languages_share_one_map() {
    let repo = make_repo(&[
        ("src/lib.rs", "pub fn parse_config() -> u32 {\n    42\n}\n"),
        ("web/app.ts", "export function render(): void {\n  console.log('x');\n}\n"),
        ("tool.go", "package main\n\nfunc Run() {\n}\n"),
    ]);
    let mapper = make_mapper(repo.path());

    let map = map_with(
        &mapper,
        MapRequest {
            max_tokens: Some(10_000),
            ..MapRequest::default()
        },
    );
    assert!(map.contains("src/lib.rs:"), "{map}");
    assert!(map.contains("web/app.ts:"), "{map}");
    assert!(map.contains("tool.go:"), "{map}");
}

#[test]
fn invalid_roots_are_rejected() {
    let missing = RepoMapper::new(
        "/definitely/not/a/real/ctxmap/root",
        Arc::new(LanguageRegistry::with_defaults()),
    );
    assert!(matches!(missing, Err(MapError::PathNotFound(_))));

    let repo = make_python_repo();
    let file_root = RepoMapper::new(
        repo.path().join("main.py"),
        Arc::new(LanguageRegistry::with_defaults()),
    );
    assert!(matches!(file_root, Err(MapError::NotADirectory(_))));
}

#[test]
fn missing_input_path_is_an_error() {
    let repo = make_python_repo();
    let mapper = make_mapper(repo.path());

    let result = mapper.get_repo_map(&MapRequest {
        paths: vec![PathBuf::from("nope")],
        ..MapRequest::default()
    });
    assert!(matches!(result, Err(MapError::PathNotFound(_))));
}

#[test]
fn registry_is_shared_across_mappers() {
    let registry = Arc::new(LanguageRegistry::with_defaults());
    let a = make_python_repo();
    let b = make_python_repo();

    let first = RepoMapper::new(a.path(), Arc::clone(&registry)).unwrap();
    let second = RepoMapper::new(b.path(), Arc::clone(&registry)).unwrap();

    let request = MapRequest {
        chat_fnames: chat(&["main.py"]),
        ..MapRequest::default()
    };
    assert_eq!(
        first.get_repo_map(&request).unwrap().0,
        second.get_repo_map(&request).unwrap().0
    );
    assert_eq!(Arc::strong_count(&registry), 3);
}
