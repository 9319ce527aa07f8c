use super::*;

#[test]
fn empty_selector_is_an_error() {
    assert!(matches!(parse(""), Err(SelectorError::Empty)));
    assert!(matches!(parse("   "), Err(SelectorError::Empty)));
}

#[test]
fn id_and_class_selectors() {
    let parsed = parse("#submit").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "#submit");

    let parsed = parse(".primary").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, ".primary");

    // Combined forms stay CSS verbatim.
    let parsed = parse("#form .field input").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "#form .field input");
}

#[test]
fn bare_tag_is_css() {
    let parsed = parse("button").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "button");
}

#[test]
fn angle_bracket_tag_unwraps() {
    let parsed = parse("<input>").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "input");
}

#[test]
fn attribute_selectors() {
    assert_eq!(parse("@name=email").unwrap().value, "[name=\"email\"]");
    assert_eq!(parse("@href^=https").unwrap().value, "[href^=\"https\"]");
    assert_eq!(parse("@src$=.png").unwrap().value, "[src$=\".png\"]");
    assert_eq!(parse("@class*=btn").unwrap().value, "[class*=\"btn\"]");
    assert_eq!(parse("@disabled").unwrap().value, "[disabled]");
    // Quoted values lose their quotes.
    assert_eq!(parse("@name=\"email\"").unwrap().value, "[name=\"email\"]");
}

#[test]
fn text_selectors_become_xpath() {
    let parsed = parse("text:Login").unwrap();
    assert_eq!(parsed.kind, SelectorKind::XPath);
    assert_eq!(parsed.value, "//*[contains(text(), 'Login')]");

    let parsed = parse("tx:Login").unwrap();
    assert_eq!(parsed.value, "//*[contains(text(), 'Login')]");

    let parsed = parse("text=Sign in").unwrap();
    assert_eq!(parsed.value, "//*[text()='Sign in']");
}

#[test]
fn xpath_passthrough() {
    for input in ["//div[@id='x']", "/html/body", "(//a)[1]", ".//span"] {
        let parsed = parse(input).unwrap();
        assert_eq!(parsed.kind, SelectorKind::XPath, "input: {input}");
        assert_eq!(parsed.value, input);
    }
}

#[test]
fn explicit_mode_prefixes() {
    let parsed = parse("css:div > span").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "div > span");

    let parsed = parse("c:.cls").unwrap();
    assert_eq!(parsed.value, ".cls");

    let parsed = parse("xpath://div").unwrap();
    assert_eq!(parsed.kind, SelectorKind::XPath);
    assert_eq!(parsed.value, "//div");

    let parsed = parse("x://div/span").unwrap();
    assert_eq!(parsed.kind, SelectorKind::XPath);
    assert_eq!(parsed.value, "//div/span");
}

#[test]
fn index_suffix_is_split_off() {
    let parsed = parse("div@i=2").unwrap();
    assert_eq!(parsed.kind, SelectorKind::Css);
    assert_eq!(parsed.value, "div");
    assert_eq!(parsed.index, Some(2));

    let parsed = parse(".item@index=10").unwrap();
    assert_eq!(parsed.value, ".item");
    assert_eq!(parsed.index, Some(10));

    let parsed = parse("text:Next@i=0").unwrap();
    assert_eq!(parsed.kind, SelectorKind::XPath);
    assert_eq!(parsed.index, Some(0));
}

#[test]
fn attribute_equals_is_not_an_index() {
    // `@id=foo` is an attribute selector, not an index suffix.
    let parsed = parse("@id=foo").unwrap();
    assert_eq!(parsed.value, "[id=\"foo\"]");
    assert_eq!(parsed.index, None);
}

#[test]
fn css_combinators_stay_css() {
    for input in ["div > span", "ul li.active", "input[type=text]", "a:hover"] {
        let parsed = parse(input).unwrap();
        assert_eq!(parsed.kind, SelectorKind::Css, "input: {input}");
        assert_eq!(parsed.value, input);
    }
}
