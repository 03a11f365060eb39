//! Chat Page

use leptos::prelude::*;

use crate::api::{self, ChatEntry, EntryKind};
use crate::components::MessageBubble;

const DEFAULT_TITLE: &str = "AI Search Engine: Context Aware Agent";

#[component]
pub fn ChatPage() -> impl IntoView {
    let (title, set_title) = signal(DEFAULT_TITLE.to_string());
    let (entries, set_entries) = signal(Vec::<ChatEntry>::new());
    let (next_id, set_next_id) = signal(0usize);
    let (input, set_input) = signal(String::new());
    let (loading, set_loading) = signal(false);
    let (api_key, set_api_key) = signal(String::new());
    let (session_id, set_session_id) = signal(None::<String>);

    wasm_bindgen_futures::spawn_local(async move {
        if let Ok(text) = api::fetch_title().await {
            set_title.set(text);
        }
    });

    let push = move |kind: EntryKind, content: String| {
        let id = next_id.get_untracked();
        set_next_id.set(id + 1);
        set_entries.update(|list| list.push(ChatEntry { id, kind, content }));
    };

    let send = move || {
        let msg = input.get_untracked();
        if msg.trim().is_empty() || loading.get_untracked() {
            return;
        }

        push(EntryKind::User, msg.clone());
        set_input.set(String::new());
        set_loading.set(true);

        let key = api_key.get_untracked();
        let session = session_id.get_untracked();
        wasm_bindgen_futures::spawn_local(async move {
            let key = Some(key.trim()).filter(|k| !k.is_empty());
            match api::send_chat(&msg, session.as_deref(), key).await {
                Ok(reply) => {
                    for (kind, content) in reply.events.iter().filter_map(api::ServerEvent::display) {
                        push(kind, content);
                    }
                    push(EntryKind::Assistant, reply.answer);
                    set_session_id.set(Some(reply.session_id));
                }
                Err(e) => push(EntryKind::Warning, e),
            }
            set_loading.set(false);
        });
    };

    view! {
        <div class="chat">
            <aside class="sidebar">
                <h2>"Settings"</h2>
                <div class="field">
                    <label>"Groq API Key"</label>
                    <input
                        type="password"
                        placeholder="gsk_..."
                        prop:value=move || api_key.get()
                        on:input=move |ev| set_api_key.set(event_target_value(&ev))
                    />
                </div>
            </aside>

            <main class="chat-main">
                <h1 class="title">{move || title.get()}</h1>

                <div class="messages">
                    <For
                        each=move || entries.get()
                        key=|entry| entry.id
                        children=move |entry| view! { <MessageBubble entry=entry /> }
                    />
                    <Show when=move || loading.get()>
                        <div class="message loading">"..."</div>
                    </Show>
                </div>

                <div class="input-area">
                    <textarea
                        placeholder="Ask about papers or anything on the web..."
                        prop:value=move || input.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                        on:keydown=move |ev| {
                            if ev.key() == "Enter" && !ev.shift_key() {
                                ev.prevent_default();
                                send();
                            }
                        }
                    />
                    <button on:click=move |_| send() disabled=move || loading.get()>
                        {move || if loading.get() { "..." } else { "Send" }}
                    </button>
                </div>
            </main>
        </div>
    }
}
