//! Streaming edits of existing XML parts.
//!
//! Events are copied from the original part to the output unchanged except
//! for the elements being replaced, so markup the model does not understand
//! (sheet views, column widths, merges, defined names, rich text) survives.
//!
//! Parts written by other tools may bind the main namespace to a prefix
//! (`<x:workbook xmlns:x="...">`). Generated markup is rendered with the
//! prefix of the element it replaces, or of the root when it is inserted.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

use crate::error::{Result, XlgenError};
use crate::namespaces::is_office_relationships_namespace;
use crate::xml_helpers::element_prefix;

use super::parts::push_string_item;

/// Namespace prefixes in effect where generated markup lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkupScope {
    /// Prefix of SpreadsheetML elements with its colon (`"x:"`), or empty.
    pub(crate) prefix: String,
    /// Prefix bound to the office relationships namespace on the root, with
    /// its colon. `None` when the root does not declare one.
    pub(crate) relationships_prefix: Option<String>,
}

impl MarkupScope {
    /// Unprefixed elements with `r:` declared, as in freshly written parts.
    pub(crate) fn fresh() -> Self {
        Self {
            prefix: String::new(),
            relationships_prefix: Some("r:".to_string()),
        }
    }

    fn of_root(e: &BytesStart) -> Self {
        let relationships_prefix = e.attributes().flatten().find_map(|attr| {
            let name = attr.key.as_ref().strip_prefix(b"xmlns:")?;
            is_office_relationships_namespace(&attr.value)
                .then(|| format!("{}:", String::from_utf8_lossy(name)))
        });
        Self {
            prefix: element_prefix(e),
            relationships_prefix,
        }
    }

    fn with_prefix(&self, prefix: String) -> Self {
        Self {
            prefix,
            relationships_prefix: self.relationships_prefix.clone(),
        }
    }
}

/// One child of the part's root element to regenerate.
pub(crate) struct Replacement<'a> {
    name: &'static [u8],
    /// Schema order of the root's children, used to place a missing element.
    order: &'static [&'static [u8]],
    render: Box<dyn Fn(&MarkupScope) -> String + 'a>,
}

impl<'a> Replacement<'a> {
    pub(crate) fn new(
        name: &'static [u8],
        order: &'static [&'static [u8]],
        render: impl Fn(&MarkupScope) -> String + 'a,
    ) -> Self {
        Self {
            name,
            order,
            render: Box::new(render),
        }
    }

    /// Whether a sibling named `local` must come after this element.
    fn precedes(&self, local: &[u8]) -> bool {
        self.order
            .iter()
            .position(|name| *name == self.name)
            .is_some_and(|own| self.order.iter().skip(own + 1).any(|name| *name == local))
    }
}

/// Regenerate direct children of the root element, matched by local name.
///
/// Only the first occurrence of each name is replaced. A child that does not
/// occur is inserted before the first sibling that must follow it, or at the
/// end of the root, so edits are never dropped. Fails on a part without a
/// root element.
pub(crate) fn replace_children(
    original: &[u8],
    part_name: &str,
    replacements: &[Replacement<'_>],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(original);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + 1024));
    let mut buf = Vec::new();

    let mut done = vec![false; replacements.len()];
    let mut root: Option<MarkupScope> = None;
    let mut depth: usize = 0;
    let mut skip_depth: usize = 0;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => {
                    return Err(XlgenError::Format(format!(
                        "{part_name}: unexpected end of document"
                    )))
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) | Event::Empty(ref e) if depth == 0 && root.is_none() => {
                let scope = MarkupScope::of_root(e);
                if matches!(event, Event::Empty(_)) {
                    writer.write_event(Event::Start(e.borrow()))?;
                    write_pending(&mut writer, replacements, &mut done, &scope, |_| true)?;
                    writer.write_event(Event::End(e.to_end()))?;
                } else {
                    depth = 1;
                    writer.write_event(Event::Start(e.borrow()))?;
                }
                root = Some(scope);
            }
            Event::Start(ref e) | Event::Empty(ref e) if depth == 1 => {
                let is_start = matches!(event, Event::Start(_));
                let local = e.local_name();
                let scope = root.clone().unwrap_or_else(MarkupScope::fresh);
                write_pending(&mut writer, replacements, &mut done, &scope, |r| {
                    r.precedes(local.as_ref())
                })?;

                let slot = replacements
                    .iter()
                    .zip(done.iter_mut())
                    .find(|(r, flag)| !**flag && r.name == local.as_ref());
                if let Some((replacement, flag)) = slot {
                    let markup = (replacement.render)(&scope.with_prefix(element_prefix(e)));
                    writer.get_mut().write_all(markup.as_bytes())?;
                    *flag = true;
                    if is_start {
                        skip_depth = 1;
                    }
                    continue;
                }

                if is_start {
                    depth += 1;
                }
                writer.write_event(event)?;
            }
            Event::Start(_) => {
                depth += 1;
                writer.write_event(event)?;
            }
            Event::End(_) => {
                if depth == 1 {
                    let scope = root.clone().unwrap_or_else(MarkupScope::fresh);
                    write_pending(&mut writer, replacements, &mut done, &scope, |_| true)?;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(event)?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if root.is_none() {
        return Err(XlgenError::Format(format!("{part_name}: no root element")));
    }
    if depth > 0 {
        return Err(XlgenError::Format(format!(
            "{part_name}: unexpected end of document"
        )));
    }
    Ok(writer.into_inner())
}

/// Insert every not-yet-written replacement accepted by `due`, in order.
fn write_pending(
    writer: &mut Writer<Vec<u8>>,
    replacements: &[Replacement<'_>],
    done: &mut [bool],
    scope: &MarkupScope,
    due: impl Fn(&Replacement<'_>) -> bool,
) -> Result<()> {
    for (replacement, flag) in replacements.iter().zip(done.iter_mut()) {
        if !*flag && due(replacement) {
            writer
                .get_mut()
                .write_all((replacement.render)(scope).as_bytes())?;
            *flag = true;
        }
    }
    Ok(())
}

/// Append entries to an existing shared-string part and refresh its
/// `count` / `uniqueCount` attributes. Existing items are copied unchanged.
pub(crate) fn append_shared_strings<'a>(
    original: &[u8],
    part_name: &str,
    appended: impl Iterator<Item = &'a str>,
    count: usize,
    unique_count: usize,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(original);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + 1024));
    let mut buf = Vec::new();
    let mut appended = Some(appended);
    let mut items = String::new();
    let mut found_root = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"sst" => {
                found_root = true;
                render_items(&mut items, &mut appended, &element_prefix(e));
                writer.write_event(Event::Start(with_counts(e, count, unique_count)))?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sst" => {
                found_root = true;
                render_items(&mut items, &mut appended, &element_prefix(e));
                let start = with_counts(e, count, unique_count);
                writer.write_event(Event::Start(start.borrow()))?;
                writer.get_mut().write_all(items.as_bytes())?;
                writer.write_event(Event::End(start.to_end()))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"sst" => {
                writer.get_mut().write_all(items.as_bytes())?;
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if !found_root {
        return Err(XlgenError::Format(format!(
            "{part_name}: no <sst> root element"
        )));
    }
    Ok(writer.into_inner())
}

/// Render the appended `<si>` items once, with the root's prefix.
fn render_items<'a>(
    items: &mut String,
    appended: &mut Option<impl Iterator<Item = &'a str>>,
    prefix: &str,
) {
    if let Some(texts) = appended.take() {
        for text in texts {
            push_string_item(items, prefix, text);
        }
    }
}

fn with_counts(e: &BytesStart, count: usize, unique_count: usize) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes().flatten() {
        if !matches!(attr.key.as_ref(), b"count" | b"uniqueCount") {
            start.push_attribute(attr);
        }
    }
    start.push_attribute(("count", count.to_string().as_str()));
    start.push_attribute(("uniqueCount", unique_count.to_string().as_str()));
    start
}
