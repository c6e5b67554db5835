use super::*;
use crate::services::layer_tree::{LayerElement, LayerTree};
use crate::test_utils::FakeHost;

/// Elements, in pre-order: `top.png`, `[bg]`, `group` (hidden) holding
/// `inner.JPG`, `empty`.
fn elements() -> Vec<LayerElement<usize>> {
    let mut host = FakeHost::new();
    host.add_layer(None, "top.png");
    host.add_layer(None, "[bg]");
    let group = host.add_group(None, "group");
    host.add_layer(Some(group), "inner.JPG");
    host.set_visible(group, false);
    host.add_group(None, "empty");
    LayerTree::from_source(&host).iter().cloned().collect()
}

fn matching(rule: LayerRule) -> Vec<String> {
    elements()
        .iter()
        .filter(|element| rule.matches(*element))
        .map(|element| element.name().to_string())
        .collect()
}

#[test]
fn test_kind_rules() {
    assert_eq!(matching(LayerRule::IsLayer), vec!["top.png", "[bg]", "inner.JPG"]);
    assert_eq!(matching(LayerRule::IsNonemptyGroup), vec!["group"]);
    assert_eq!(matching(LayerRule::IsEmptyGroup), vec!["empty"]);
}

#[test]
fn test_position_and_visibility_rules() {
    assert_eq!(matching(LayerRule::IsTopLevel), vec!["top.png", "[bg]", "group", "empty"]);
    assert_eq!(matching(LayerRule::IsPathVisible), vec!["top.png", "[bg]", "empty"]);
}

#[test]
fn test_extension_rules() {
    assert_eq!(matching(LayerRule::HasFileExtension), vec!["top.png", "inner.JPG"]);
    assert_eq!(
        matching(LayerRule::HasMatchingFileExtension("jpg".into())),
        vec!["inner.JPG"]
    );
    assert_eq!(
        matching(LayerRule::HasMatchingFileExtension(".PNG".into())),
        vec!["top.png"]
    );
}

#[test]
fn test_bracket_rules() {
    assert_eq!(matching(LayerRule::IsEnclosedInSquareBrackets), vec!["[bg]"]);
    assert_eq!(
        matching(LayerRule::IsNotEnclosedInSquareBrackets),
        vec!["top.png", "group", "inner.JPG", "empty"]
    );
}

#[test]
fn test_layer_rules_compose_in_filter() {
    let mut layer_types = ObjectFilter::new(MatchType::Any);
    layer_types.add_rule(LayerRule::IsLayer);
    layer_types.add_rule(LayerRule::IsEmptyGroup);

    let mut filter = ObjectFilter::new(MatchType::All);
    filter.add_rule(LayerRule::IsPathVisible);
    filter.add_subfilter("layer_types", layer_types).unwrap();

    let names: Vec<String> = elements()
        .iter()
        .filter(|element| filter.is_match(*element))
        .map(|element| element.name().to_string())
        .collect();
    assert_eq!(names, vec!["top.png", "[bg]", "empty"]);
}
