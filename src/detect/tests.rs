use std::sync::Arc;

use proptest::prelude::*;
use yare::parameterized;

use super::*;
use crate::pattern::{PatternParser, PatternTree};
use crate::semantic::{Compilation, SemanticModel};
use crate::syntax::{SyntaxTree, TokenId};
use crate::virtual_chars::{VirtualCharError, VirtualCharSequence};

fn wrap(body: &str) -> String {
    format!(
        "using System.Text.RegularExpressions;\n\
         class C\n{{\n    void M(string input, RegexOptions dynamic)\n    {{\n{body}\n    }}\n}}\n"
    )
}

fn model_for(source: &str) -> Arc<SemanticModel> {
    let tree = SyntaxTree::parse(source).unwrap();
    Compilation::with_prelude([tree]).unwrap().semantic_model(0)
}

fn token(model: &SemanticModel, text: &str) -> TokenId {
    let tree = model.tree();
    tree.tokens()
        .find(|&t| tree.token_text(t) == text)
        .unwrap_or_else(|| panic!("token {text:?} not found"))
}

fn detector(model: &Arc<SemanticModel>) -> Arc<PatternDetector> {
    DetectorCache::new(EngineConfig::default())
        .unwrap()
        .get(model)
        .expect("engine type is declared")
}

/// The `a+` literal of `body`, in whatever string form it is written.
fn classify(body: &str) -> Option<PatternOptions> {
    let model = model_for(&wrap(body));
    let tree = model.tree();
    let literal = tree
        .tokens()
        .find(|&t| tree.token_text(t).ends_with("a+\""))
        .expect("body has an a+ literal");
    detector(&model).is_pattern(&model, literal)
}

// --- Classification ---

#[parameterized(
    static_method = { r#"Regex.IsMatch(input, "a+");"#, Some(PatternOptions::NONE) },
    qualified_static = {
        r#"System.Text.RegularExpressions.Regex.Match(input, "a+");"#,
        Some(PatternOptions::NONE)
    },
    constant_options = {
        r#"Regex.IsMatch(input, "a+", RegexOptions.IgnoreCase);"#,
        Some(PatternOptions::IGNORE_CASE)
    },
    combined_options = {
        r#"Regex.Replace(input, "a+", "b", RegexOptions.IgnoreCase | RegexOptions.Multiline);"#,
        Some(PatternOptions::IGNORE_CASE | PatternOptions::MULTILINE)
    },
    cast_options = {
        r#"Regex.IsMatch(input, "a+", (RegexOptions)16);"#,
        Some(PatternOptions::SINGLELINE)
    },
    cast_masked_shift = {
        r#"Regex.IsMatch(input, "a+", (RegexOptions)(1 << 40));"#,
        Some(PatternOptions::ECMA_SCRIPT)
    },
    cast_overflow = {
        r#"Regex.IsMatch(input, "a+", (RegexOptions)(0x7FFFFFFF + 1));"#,
        Some(PatternOptions::NONE)
    },
    variable_options = { r#"Regex.IsMatch(input, "a+", dynamic);"#, Some(PatternOptions::NONE) },
    const_local_options = {
        r#"const RegexOptions o = RegexOptions.Compiled; Regex.IsMatch(input, "a+", o);"#,
        Some(PatternOptions::COMPILED)
    },
    named_arguments = {
        r#"Regex.IsMatch(pattern: "a+", input: input, options: RegexOptions.ExplicitCapture);"#,
        Some(PatternOptions::EXPLICIT_CAPTURE)
    },
    verbatim = { r#"Regex.IsMatch(input, @"a+");"#, Some(PatternOptions::NONE) },
    constructor = { r#"var r = new Regex("a+");"#, Some(PatternOptions::NONE) },
    constructor_options = {
        r#"var r = new Regex("a+", RegexOptions.RightToLeft);"#,
        Some(PatternOptions::RIGHT_TO_LEFT)
    },
    qualified_constructor = {
        r#"var r = new System.Text.RegularExpressions.Regex("a+");"#,
        Some(PatternOptions::NONE)
    },
    input_argument = { r#"Regex.IsMatch("a+", input);"#, None },
    named_input_argument = { r#"Regex.IsMatch(pattern: input, input: "a+");"#, None },
    non_pattern_parameter = { r#"Regex.Escape("a+");"#, None },
    instance_method = { r#"var r = new Regex(input); r.IsMatch("a+");"#, None },
    parenthesized = { r#"Regex.IsMatch(input, ("a+"));"#, None },
    plain_local = { r#"var s = "a+";"#, None },
    interpolated = { r#"Regex.IsMatch(input, $"a+");"#, None },
    directive_inline = {
        r#"var s = /* language=pattern,IgnoreCase */ "a+";"#,
        Some(PatternOptions::IGNORE_CASE)
    },
    directive_above = {
        "// language=pattern,Multiline,Singleline\n var s = \"a+\";",
        Some(PatternOptions::MULTILINE | PatternOptions::SINGLELINE)
    },
    directive_stops_at_unknown = {
        "// language=pattern,IgnoreCase,Bogus,Multiline\n var s = \"a+\";",
        Some(PatternOptions::IGNORE_CASE)
    },
    directive_overrides_arguments = {
        r#"Regex.IsMatch(input, /* language=pattern */ "a+", RegexOptions.IgnoreCase);"#,
        Some(PatternOptions::NONE)
    },
)]
fn test_is_pattern(body: &str, expected: Option<PatternOptions>) {
    assert_eq!(classify(body), expected);
}

#[test]
fn test_same_named_type_in_other_namespace() {
    let model = model_for(
        r#"
namespace Other
{
    public class Regex
    {
        public Regex(string pattern) { }
        public static bool IsMatch(string input, string pattern) => true;
    }
}

class C
{
    void M(string input)
    {
        var a = new Other.Regex("x");
        var b = new System.Text.RegularExpressions.Regex("y");
        Other.Regex.IsMatch(input, "z");
    }
}
"#,
    );
    let detector = detector(&model);
    assert_eq!(detector.is_pattern(&model, token(&model, "\"x\"")), None);
    assert_eq!(
        detector.is_pattern(&model, token(&model, "\"y\"")),
        Some(PatternOptions::NONE)
    );
    assert_eq!(detector.is_pattern(&model, token(&model, "\"z\"")), None);
}

#[test]
fn test_options_sibling_in_list_order() {
    let model = model_for(
        r#"
using System.Text.RegularExpressions;

class Engine
{
    public static bool Test(RegexOptions first, string pattern, RegexOptions second) => true;
}

class C
{
    void M(RegexOptions dynamic)
    {
        Engine.Test(RegexOptions.Multiline, "a", RegexOptions.IgnoreCase);
        Engine.Test(dynamic, "b", RegexOptions.IgnoreCase);
    }
}
"#,
    );
    let config = EngineConfig {
        engine_type: "Engine".to_string(),
        ..EngineConfig::default()
    };
    let detector = DetectorCache::new(config).unwrap().get(&model).unwrap();
    assert_eq!(
        detector.is_pattern(&model, token(&model, "\"a\"")),
        Some(PatternOptions::MULTILINE)
    );
    // A non-constant sibling is skipped, not fatal.
    assert_eq!(
        detector.is_pattern(&model, token(&model, "\"b\"")),
        Some(PatternOptions::IGNORE_CASE)
    );
}

#[test]
fn test_method_names() {
    let model = model_for(&wrap(""));
    let detector = detector(&model);
    assert_eq!(
        detector.method_names(),
        ["Count", "IsMatch", "Match", "Matches", "Replace", "Split"]
    );
}

#[test]
fn test_definitely_not_pattern() {
    let model = model_for(&wrap(
        r#"var s = "plain"; Regex.IsMatch(input, "a+"); Foo("arg");"#,
    ));
    let detector = detector(&model);
    assert!(detector.is_definitely_not_pattern(&model, token(&model, "\"plain\"")));
    assert!(detector.is_definitely_not_pattern(&model, token(&model, "Regex")));
    assert!(!detector.is_definitely_not_pattern(&model, token(&model, "\"a+\"")));
    // Any argument literal survives the syntactic check, even for unknown methods.
    assert!(!detector.is_definitely_not_pattern(&model, token(&model, "\"arg\"")));
    assert_eq!(detector.is_pattern(&model, token(&model, "\"arg\"")), None);
}

// --- Cache ---

#[test]
fn test_engine_type_resolved_once_per_model() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+"); Regex.IsMatch(input, "b");"#));
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let before = model.compilation().type_lookups();
    let first = cache.get(&model).unwrap();
    let second = cache.get(&model).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_pattern(&model, token(&model, "\"a+\"")).is_some());
    assert!(second.is_pattern(&model, token(&model, "\"b\"")).is_some());
    assert_eq!(model.compilation().type_lookups() - before, 1);
}

#[test]
fn test_missing_engine_is_cached() {
    let tree = SyntaxTree::parse(wrap(r#"Regex.IsMatch(input, "a+");"#)).unwrap();
    let model = Compilation::new([tree]).semantic_model(0);
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    assert!(cache.get(&model).is_none());
    assert!(cache.get(&model).is_none());
    assert_eq!(model.compilation().type_lookups(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_models_are_distinct_contexts() {
    let model = model_for(&wrap(""));
    let other = model.compilation().semantic_model(0);
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let a = cache.get(&model).unwrap();
    let b = cache.get(&other).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cache_does_not_keep_models_alive() {
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let model = model_for(&wrap(""));
    let weak = Arc::downgrade(&model);
    let detector = cache.get(&model).unwrap();
    drop(model);
    assert!(weak.upgrade().is_none());
    assert_eq!(cache.len(), 1);
    cache.purge();
    assert!(cache.is_empty());
    // The detector itself stays usable as a value.
    assert!(!detector.method_names().is_empty());
}

#[test]
fn test_dead_entries_pruned_on_insert() {
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    for _ in 0..3 {
        let model = model_for(&wrap(""));
        cache.get(&model);
    }
    let model = model_for(&wrap(""));
    cache.get(&model);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_evict() {
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let model = model_for(&wrap(""));
    let first = cache.get(&model).unwrap();
    cache.evict(&model);
    assert!(cache.is_empty());
    let second = cache.get(&model).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_concurrent_creation_yields_one_detector() {
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let before = model.compilation().type_lookups();
    let detectors: Vec<Arc<PatternDetector>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.get(&model).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(detectors.iter().all(|d| Arc::ptr_eq(d, &detectors[0])));
    assert_eq!(model.compilation().type_lookups() - before, 1);
}

#[test]
fn test_shared_cache_helpers() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let literal = token(&model, "\"a+\"");
    assert_eq!(is_pattern(&model, literal), Some(PatternOptions::NONE));
    let tree = try_parse(&model, literal, &CancellationToken::new()).unwrap().unwrap();
    assert_eq!(tree.text(), "a+");
    DetectorCache::shared().evict(&model);
}

#[test]
fn test_invalid_config() {
    let config = EngineConfig {
        options_type: String::new(),
        ..EngineConfig::default()
    };
    assert!(matches!(
        DetectorCache::new(config),
        Err(ConfigError::EmptyName("options_type"))
    ));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "not created for")]
fn test_detector_bound_to_its_model() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let other = model.compilation().semantic_model(0);
    let detector = detector(&model);
    detector.is_pattern(&other, token(&other, "\"a+\""));
}

// --- Tree building ---

#[test]
fn test_try_parse_classified_literal() {
    let model = model_for(&wrap(
        r#"Regex.IsMatch(input, "(?<word>\\w+) # note", RegexOptions.IgnorePatternWhitespace);"#,
    ));
    let literal = token(&model, r#""(?<word>\\w+) # note""#);
    let tree = detector(&model)
        .try_parse(&model, literal, &CancellationToken::new())
        .unwrap()
        .unwrap();
    assert_eq!(tree.text(), r"(?<word>\w+) # note");
    assert!(tree.options().contains(PatternOptions::IGNORE_PATTERN_WHITESPACE));
    assert!(tree.is_valid());
    assert_eq!(tree.capture_names(), ["0", "word"]);
}

#[test]
fn test_try_parse_not_a_pattern() {
    let model = model_for(&wrap(r#"var s = "a+";"#));
    let result = detector(&model).try_parse(&model, token(&model, "\"a+\""), &CancellationToken::new());
    assert_eq!(result.map(|tree| tree.is_none()), Ok(true));
}

#[test]
fn test_malformed_pattern_still_yields_tree() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "ab)c");"#));
    let literal = token(&model, "\"ab)c\"");
    let tree = detector(&model)
        .try_parse(&model, literal, &CancellationToken::new())
        .unwrap()
        .unwrap();
    assert_eq!(tree.diagnostics().len(), 1);
    let span = tree.source_span(&tree.diagnostics()[0].span);
    assert_eq!(model.tree().text().slice(span), ")");
}

#[test]
fn test_undecodable_literal() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "\uD800");"#));
    let result = detector(&model).try_parse(&model, token(&model, r#""\uD800""#), &CancellationToken::new());
    assert!(matches!(
        result,
        Err(TreeBuildError::InvalidLiteral(VirtualCharError::InvalidCodePoint(_)))
    ));
}

struct Declining;

impl PatternParser for Declining {
    fn parse(&self, _chars: &VirtualCharSequence, _options: PatternOptions) -> Option<PatternTree> {
        None
    }
}

#[test]
fn test_parser_may_decline() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let cache = DetectorCache::with_parser(EngineConfig::default(), Arc::new(Declining)).unwrap();
    let result = cache
        .get(&model)
        .unwrap()
        .try_parse(&model, token(&model, "\"a+\""), &CancellationToken::new());
    assert_eq!(result.map(|_| ()), Err(TreeBuildError::ParserDeclined));
}

#[test]
fn test_try_parse_cancelled() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let detector = cache.get(&model).unwrap();
    let lookups = model.compilation().type_lookups();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = detector.try_parse(&model, token(&model, "\"a+\""), &cancel);
    assert_eq!(result.map(|_| ()), Err(TreeBuildError::Cancelled(Cancelled)));

    // The cached detector survives and keeps working.
    assert!(Arc::ptr_eq(&cache.get(&model).unwrap(), &detector));
    assert_eq!(model.compilation().type_lookups(), lookups);
    let result = detector.try_parse(&model, token(&model, "\"a+\""), &CancellationToken::new());
    assert!(result.unwrap().is_some());
}

// --- Scan ---

#[test]
fn test_scan_in_source_order() {
    let model = model_for(&wrap(
        r#"var plain = "x";
        Regex.IsMatch(input, "first");
        // language=pattern,IgnoreCase
        var marked = "second";
        var r = new Regex("thi(rd", RegexOptions.Multiline);"#,
    ));
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let found = scan(&cache, &model, &CancellationToken::new()).unwrap();
    let summary: Vec<(String, PatternOptions, bool)> = found
        .iter()
        .map(|p| {
            let tree = p.tree.as_ref().unwrap();
            (tree.text(), p.options, tree.is_valid())
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("first".to_string(), PatternOptions::NONE, true),
            ("second".to_string(), PatternOptions::IGNORE_CASE, true),
            ("thi(rd".to_string(), PatternOptions::MULTILINE, false),
        ]
    );
    assert_eq!(model.tree().text().slice(found[0].span), "\"first\"");
}

#[test]
fn test_scan_matches_per_token_classification() {
    let model = model_for(&wrap(
        r#"/* language=pattern,Singleline */ var a = "x";
        Regex.IsMatch(input, "y", RegexOptions.IgnoreCase);
        Foo("z");
        var b = "w";"#,
    ));
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let detector = cache.get(&model).unwrap();
    let tree = model.tree();
    let expected: Vec<(TokenId, PatternOptions)> = tree
        .tokens()
        .filter_map(|t| detector.is_pattern(&model, t).map(|options| (t, options)))
        .collect();
    for t in tree.tokens() {
        if detector.is_definitely_not_pattern(&model, t) {
            assert_eq!(detector.is_pattern(&model, t), None);
        }
    }
    let found: Vec<(TokenId, PatternOptions)> = scan(&cache, &model, &CancellationToken::new())
        .unwrap()
        .iter()
        .map(|p| (p.token, p.options))
        .collect();
    assert_eq!(found, expected);
    assert_eq!(
        found.iter().map(|&(_, options)| options).collect::<Vec<_>>(),
        [PatternOptions::SINGLELINE, PatternOptions::IGNORE_CASE]
    );
}

#[test]
fn test_scan_cancelled() {
    let model = model_for(&wrap(r#"Regex.IsMatch(input, "a+");"#));
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(scan(&cache, &model, &cancel).map(|found| found.len()), Err(Cancelled));
}

#[test]
fn test_scan_without_engine() {
    let tree = SyntaxTree::parse(r#"class C { string s = "a"; }"#).unwrap();
    let model = Compilation::new([tree]).semantic_model(0);
    let cache = DetectorCache::new(EngineConfig::default()).unwrap();
    assert!(scan(&cache, &model, &CancellationToken::new()).unwrap().is_empty());
}

// --- Properties ---

proptest! {
    #[test]
    fn prop_non_string_tokens_are_never_patterns(name in "[a-z][a-z0-9_]{0,8}", number in 0u32..100_000) {
        let model = model_for(&wrap(&format!(
            "// language=pattern\n var {name}x = Regex.IsMatch(input, \"a\", (RegexOptions){number});"
        )));
        let detector = detector(&model);
        let tree = model.tree();
        for token in tree.tokens() {
            if !tree.token_kind(token).is_string_literal() {
                prop_assert!(detector.is_definitely_not_pattern(&model, token));
                prop_assert_eq!(detector.is_pattern(&model, token), None);
            }
        }
    }

    #[test]
    fn prop_classified_literals_always_build(pattern in "[a-zA-Z0-9 ()|*+?.\\[\\]{},^$-]{0,16}") {
        let model = model_for(&wrap(&format!("Regex.IsMatch(input, @\"{pattern}\");")));
        let literal = token(&model, &format!("@\"{pattern}\""));
        let result = detector(&model).try_parse(&model, literal, &CancellationToken::new());
        let tree = result.unwrap();
        prop_assert!(tree.is_some());
        prop_assert_eq!(tree.map(|t| t.text()), Some(pattern));
    }
}
