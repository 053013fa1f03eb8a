//! JavaScript snippets run inside the rendered page.

/// Click the bound element from script, bypassing overlay hit-testing.
pub const CLICK_ELEMENT: &str = "function() { this.click(); }";

/// Bring the bound element into the middle of the viewport.
pub const SCROLL_INTO_VIEW: &str = "function() { this.scrollIntoView({block: 'center'}); }";

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Generate JavaScript that clicks elements whose visible text contains any
/// of `labels`.
///
/// `selector` narrows the candidates (e.g. `"li, a, button, label"`). With
/// `first_only` the script stops after the first click. Evaluates to the
/// number of elements clicked.
pub fn click_by_label(selector: &str, labels: &[&str], first_only: bool) -> String {
    let labels = labels
        .iter()
        .map(|label| js_string(label))
        .collect::<Vec<_>>()
        .join(", ");
    let selector = js_string(selector);

    format!(
        r#"
        (() => {{
            const labels = [{labels}];
            let clicked = 0;
            for (const el of document.querySelectorAll({selector})) {{
                const text = el.innerText || '';
                if (labels.some(label => text.includes(label))) {{
                    el.click();
                    clicked += 1;
                    if ({first_only}) {{
                        break;
                    }}
                }}
            }}
            return clicked;
        }})()
        "#
    )
}
