//! RSS 2.0 serialization.
//!
//! Renders an assembled [`Feed`] into the wire format. Output is
//! deterministic: the only timestamps are the entries' own publication
//! times, and `lastBuildDate` is taken from the newest entry rather than
//! the wall clock, so identical input produces byte-identical bytes.
//!
//! Escaping discipline: every text field (titles, authors, channel
//! metadata, all of it potentially upstream-controlled) goes through
//! [`xml_escape`]. Entry bodies are HTML already entity-escaped by maud at
//! assembly time and are emitted inside CDATA; the CDATA terminator is
//! split defensively anyway.

use std::fmt::Write;

use poapfeed_core::{Feed, FeedEntry};

/// Generator string advertised in the channel.
const GENERATOR: &str = concat!("poapfeed/", env!("CARGO_PKG_VERSION"));

/// Serialize a feed into an RSS 2.0 document.
pub fn render_feed(feed: &Feed) -> String {
    let mut out = String::with_capacity(1024 + feed.entries.len() * 512);

    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(concat!(
        r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/""#,
        r#" xmlns:atom="http://www.w3.org/2005/Atom">"#,
    ));
    out.push('\n');
    out.push_str("  <channel>\n");

    text_element(&mut out, 4, "title", &feed.channel.title);
    text_element(&mut out, 4, "description", &feed.channel.description);
    text_element(&mut out, 4, "link", &feed.channel.link);
    text_element(&mut out, 4, "language", "en-us");
    text_element(&mut out, 4, "generator", GENERATOR);

    // Newest entry time stands in for the build time, keeping re-renders
    // of unchanged data identical.
    if let Some(newest) = feed.entries.iter().map(|e| e.published_at).max() {
        text_element(&mut out, 4, "lastBuildDate", &newest.to_rfc2822());
    }

    let _ = writeln!(
        out,
        r#"    <atom:link href="{}" rel="self" type="application/rss+xml"/>"#,
        xml_escape(&feed.channel.self_url)
    );

    for entry in &feed.entries {
        render_entry(&mut out, entry);
    }

    out.push_str("  </channel>\n");
    out.push_str("</rss>\n");
    out
}

/// Serialize one `<item>`.
fn render_entry(out: &mut String, entry: &FeedEntry) {
    out.push_str("    <item>\n");
    text_element(out, 6, "title", &entry.title);
    if let Some(author) = &entry.author {
        text_element(out, 6, "author", author);
    }
    let _ = writeln!(out, "      <description>{}</description>", cdata(&entry.body));
    if entry.guid_is_permalink {
        text_element(out, 6, "guid", &entry.guid);
    } else {
        let _ = writeln!(
            out,
            r#"      <guid isPermaLink="false">{}</guid>"#,
            xml_escape(&entry.guid)
        );
    }
    text_element(out, 6, "link", &entry.link);
    text_element(out, 6, "pubDate", &entry.published_at.to_rfc2822());
    out.push_str("    </item>\n");
}

/// Write an indented `<name>escaped text</name>` line.
fn text_element(out: &mut String, indent: usize, name: &str, text: &str) {
    let _ = writeln!(
        out,
        "{:indent$}<{name}>{}</{name}>",
        "",
        xml_escape(text),
        indent = indent
    );
}

/// Escape the five XML-special characters.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap HTML in a CDATA section, splitting any embedded terminator.
fn cdata(html: &str) -> String {
    format!("<![CDATA[{}]]>", html.replace("]]>", "]]]]><![CDATA[>"))
}
