use maud::{html, Markup, DOCTYPE};
use shared_types::{HttpMethod, KeyValuePair, ResponseEnvelope};

use crate::composer::Composer;
use crate::draft::Rows;

pub fn rows_segment(rows: Rows) -> &'static str {
    match rows {
        Rows::Headers => "headers",
        Rows::QueryParams => "params",
    }
}

pub fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "status-success",
        300..=399 => "status-redirect",
        400..=u16::MAX => "status-error",
        _ => "status-neutral",
    }
}

fn method_class(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "method-get",
        HttpMethod::Post => "method-post",
        HttpMethod::Put => "method-put",
        HttpMethod::Delete => "method-delete",
        HttpMethod::Patch => "method-patch",
    }
}

pub fn index(composer: &Composer) -> Markup {
    page(
        "API Tester",
        html! {
            (sidebar(composer))
            section ."workspace" {
                (request_bar(composer))
                @if let Some(notice) = &composer.notice {
                    pre ."notice" role="alert" { (notice) }
                }
                div ."panels" {
                    section ."request-panel" {
                        h2 { "Query Params" }
                        (key_values(Rows::QueryParams, &composer.draft.query_params, "Parameter"))
                        h2 { "Headers" }
                        (key_values(Rows::Headers, &composer.draft.headers, "Header"))
                        h2 { "Body" }
                        (body_editor(composer))
                    }
                    section ."response-panel" {
                        (response_panel(composer.response.as_ref(), composer.loading))
                    }
                }
            }
        },
    )
}

fn request_bar(composer: &Composer) -> Markup {
    let draft = &composer.draft;
    html! {
        form id="send-form" action="/send" method="POST" {
            input name="name" type="text" placeholder="Request name (optional)" value=(draft.name);
            div ."url-bar" {
                select name="method" hx-post="/draft/method" hx-trigger="change" hx-include="#send-form" hx-target="body" {
                    @for method in HttpMethod::ALL {
                        option value=(method.as_str()) selected[method == draft.method] { (method.as_str()) }
                    }
                }
                input name="url" type="text" placeholder="Enter request URL" value=(draft.url);
                button type="submit" disabled[composer.loading] {
                    @if composer.loading { "Sending..." } @else { "Send" }
                }
            }
        }
    }
}

fn key_values(rows: Rows, items: &[KeyValuePair], placeholder: &str) -> Markup {
    let segment = rows_segment(rows);
    html! {
        div ."key-values" {
            @for (index, item) in items.iter().enumerate() {
                @let url = format!("/rows/{}/{}", segment, index);
                form ."key-value" hx-put=(url) hx-trigger="change" hx-include="#send-form" hx-target="body" {
                    input name="enabled" type="checkbox" checked[item.enabled];
                    input name="key" type="text" placeholder=(placeholder) value=(item.key);
                    input name="value" type="text" placeholder="Value" value=(item.value);
                    button type="button" hx-delete=(url) hx-include="#send-form" hx-target="body" { "Remove" }
                }
            }
            @let add_url = format!("/rows/{}", segment);
            button hx-post=(add_url) hx-include="#send-form" hx-target="body" { "+ Add " (placeholder) }
        }
    }
}

fn body_editor(composer: &Composer) -> Markup {
    let draft = &composer.draft;
    let allows_body = draft.method.allows_body();
    html! {
        @if !allows_body {
            p ."info" { "GET requests cannot have a body. Body will not be sent with this request." }
        }
        div ."body-actions" {
            button hx-post="/body/format" hx-include="#send-form" hx-target="body" disabled[!allows_body] { "Format JSON" }
            button hx-post="/body/clear" hx-include="#send-form" hx-target="body" disabled[!allows_body] { "Clear" }
        }
        textarea name="body" form="send-form" disabled[!allows_body]
            placeholder=(if allows_body { r#"{"key": "value"}"# } else { "Body not allowed for GET requests" }) {
            (draft.body)
        }
    }
}

pub fn response_panel(response: Option<&ResponseEnvelope>, loading: bool) -> Markup {
    if loading {
        return html! { div ."placeholder" { "Sending request..." } };
    }
    let Some(response) = response else {
        return html! { div ."placeholder" { "Send a request to see the response" } };
    };

    html! {
        div ."status-bar" {
            span { "Status: " }
            span class=(status_class(response.status)) {
                (response.status) " " (response.status_text)
            }
            span { "Time: " }
            span ."duration" { (response.duration) "ms" }
        }
        h3 { "Body" }
        pre ."response-body" { (format_data(&response.data)) }
        h3 { "Headers" }
        dl ."response-headers" {
            @for (key, value) in &response.headers {
                dt { (key) }
                dd { (value) }
            }
        }
    }
}

pub fn format_data(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn sidebar(composer: &Composer) -> Markup {
    let history = composer.history();
    html! {
        aside ."sidebar" {
            h2 { "History" }
            @if history.is_empty() {
                p ."empty" { "No saved requests yet" }
            } @else {
                ul {
                    @for request in history.iter() {
                        @let url = format!("/requests/{}", request.id);
                        @let selected = composer.selected.as_deref() == Some(request.id.as_str());
                        li.selected[selected] {
                            a href=(url) {
                                span class=(method_class(request.method)) { (request.method.as_str()) }
                                p ."name" { (request.name) }
                                p ."url" { (request.url) }
                            }
                            button hx-delete=(url) hx-target="body" { "Delete" }
                        }
                    }
                }
            }
        }
    }
}

pub fn page(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                link rel="stylesheet" type="text/css" href="/static/style.css";
                title { (title) }
            }
            body hx-boost="true" {
                main ."container" {
                    (content)
                }
                script src="https://unpkg.com/htmx.org@1.9.4" {}
            }
        }
    }
}
