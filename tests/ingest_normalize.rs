// tests/ingest_normalize.rs
use news_collector::ingest::{normalize_text, MAX_TEXT_CHARS};

#[test]
fn empty_is_ok() {
    assert_eq!(normalize_text(""), "");
    assert_eq!(normalize_text(" \n\t "), "");
}

#[test]
fn strips_html_and_unescapes() {
    let s = "<p>Hello&nbsp;<b>world</b> &ldquo;ok&rdquo; &amp; more</p>";
    let n = normalize_text(s);
    assert_eq!(n, "Hello world \u{201c}ok\u{201d} & more");
}

#[test]
fn escaped_markup_is_stripped_too() {
    let s = "&lt;p&gt;Rates &lt;em&gt;unchanged&lt;/em&gt;&lt;/p&gt;";
    assert_eq!(normalize_text(s), "Rates unchanged");
}

#[test]
fn folds_whitespace_and_nbsp() {
    let s = "A\u{00A0}\n\tB   C";
    let n = normalize_text(s);
    assert_eq!(n, "A B C");
}

#[test]
fn length_cap_applies() {
    let s = "x".repeat(2_000);
    let n = normalize_text(&s);
    assert_eq!(n.chars().count(), MAX_TEXT_CHARS);
    assert!(n.ends_with("..."));
    assert_eq!(&n[..497], "x".repeat(497));
}

#[test]
fn text_at_the_cap_is_untouched() {
    let s = "y".repeat(MAX_TEXT_CHARS);
    assert_eq!(normalize_text(&s), s);
}

#[test]
fn double_escaped_text_is_fully_decoded() {
    assert_eq!(normalize_text("AT&amp;amp;T lucra mais"), "AT&T lucra mais");
    assert_eq!(
        normalize_text("&amp;lt;p&amp;gt;Fed &amp;amp;amp; BCE&amp;lt;/p&amp;gt;"),
        "Fed & BCE"
    );
}

#[test]
fn normalizing_twice_changes_nothing() {
    let long = "word ".repeat(300);
    let long_escaped = "&amp;amp; ".repeat(200);
    let samples: [&str; 8] = [
        "<div>  Fed <i>holds</i>\n rates&nbsp;steady </div>",
        "Plain headline",
        long.as_str(),
        "Ações da Petrobras sobem 3% &mdash; mercado reage",
        "AT&amp;amp;T lucra mais",
        "&amp;lt;b&amp;gt;Ibovespa&amp;lt;/b&amp;gt; fecha em alta",
        "&<b></b>amp; tag split entity",
        long_escaped.as_str(),
    ];
    for s in samples {
        let once = normalize_text(s);
        assert_eq!(normalize_text(&once), once, "input: {s:?}");
    }
}
