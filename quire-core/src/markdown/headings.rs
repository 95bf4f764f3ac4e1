//! Heading slugs and self-referencing anchors.

use crate::models::Heading;
use crate::slug::SlugTracker;
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where the self-link goes relative to the heading content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorBehavior {
    /// The whole heading content becomes the link
    #[default]
    Wrap,
    /// A `#` marker link before the content
    Prepend,
    /// A `#` marker link after the content
    Append,
}

/// Assign unique slugs to headings in document order.
///
/// ```
/// use quire_core::markdown::headings::inject_anchors;
///
/// let slugs: Vec<_> = inject_anchors(&[(1, "Intro"), (2, "Intro")])
///     .into_iter()
///     .map(|h| h.slug)
///     .collect();
/// assert_eq!(slugs, ["intro", "intro-2"]);
/// ```
pub fn inject_anchors(headings: &[(u8, &str)]) -> Vec<Heading> {
    let mut tracker = SlugTracker::new();
    headings
        .iter()
        .map(|(level, text)| Heading {
            level: *level,
            text: text.to_string(),
            slug: tracker.slug_for(text),
        })
        .collect()
}

/// Event transformer that sets heading ids and inserts anchor links
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingAnchorTransformer {
    behavior: AnchorBehavior,
}

impl HeadingAnchorTransformer {
    pub fn new(behavior: AnchorBehavior) -> Self {
        Self { behavior }
    }

    /// Returns the rewritten events and the headings found, in document order.
    ///
    /// Explicit `{#id}` attributes are kept and reserved so generated slugs
    /// never collide with them.
    pub fn transform<'e>(&self, events: Vec<Event<'e>>) -> (Vec<Event<'e>>, Vec<Heading>) {
        let headings = self.assign_slugs(&events);
        let mut slugs = headings.iter().map(|h| h.slug.clone());
        let mut result = Vec::with_capacity(events.len() + headings.len() * 2);
        let mut current: Option<String> = None;

        for event in events {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    id: _,
                    classes,
                    attrs,
                }) => {
                    let slug = slugs.next().unwrap_or_default();
                    result.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(CowStr::from(slug.clone())),
                        classes,
                        attrs,
                    }));
                    match self.behavior {
                        AnchorBehavior::Wrap => {
                            result.push(Event::InlineHtml(CowStr::from(format!(
                                "<a href=\"#{}\">",
                                slug
                            ))));
                        }
                        AnchorBehavior::Prepend => result.push(marker(&slug)),
                        AnchorBehavior::Append => {}
                    }
                    current = Some(slug);
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(slug) = current.take() {
                        match self.behavior {
                            AnchorBehavior::Wrap => {
                                result.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                            }
                            AnchorBehavior::Append => result.push(marker(&slug)),
                            AnchorBehavior::Prepend => {}
                        }
                    }
                    result.push(Event::End(TagEnd::Heading(level)));
                }
                other => result.push(other),
            }
        }

        (result, headings)
    }

    fn assign_slugs(&self, events: &[Event<'_>]) -> Vec<Heading> {
        let mut tracker = SlugTracker::new();
        for event in events {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
                tracker.reserve(id);
            }
        }

        let mut headings = Vec::new();
        let mut explicit_seen = HashSet::new();
        let mut current: Option<(u8, Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    let explicit = id.as_ref().map(|s| s.to_string());
                    current = Some((*level as u8, explicit, String::new()));
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, _, ref mut title)) = current {
                        title.push_str(text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, explicit, text)) = current.take() {
                        // The first heading claiming an explicit id keeps it verbatim
                        let slug = match explicit {
                            Some(id) if explicit_seen.insert(id.clone()) => id,
                            Some(id) => tracker.unique(&id),
                            None => tracker.slug_for(&text),
                        };
                        headings.push(Heading { level, text, slug });
                    }
                }
                _ => {}
            }
        }

        headings
    }
}

fn marker<'e>(slug: &str) -> Event<'e> {
    Event::InlineHtml(CowStr::from(format!(
        "<a class=\"heading-anchor\" href=\"#{}\" aria-hidden=\"true\">#</a>",
        slug
    )))
}
