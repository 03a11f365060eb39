//! UI Components

use leptos::prelude::*;

use crate::api::{ChatEntry, EntryKind};

/// Message bubble component
#[component]
pub fn MessageBubble(entry: ChatEntry) -> impl IntoView {
    let class = format!("message message-{}", entry.kind.css());
    let label = entry.kind.label();

    match entry.kind {
        // Reasoning stays collapsed so answers stand out
        EntryKind::Thought => view! {
            <details class=class>
                <summary class="role">{label}</summary>
                <pre class="content">{entry.content}</pre>
            </details>
        }
        .into_any(),
        _ => view! {
            <div class=class>
                <span class="role">{label}</span>
                <p class="content">{entry.content}</p>
            </div>
        }
        .into_any(),
    }
}
