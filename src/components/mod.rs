use yew::prelude::*;

/// Class on the rendered `<ul>`, styled by the checkout theme.
pub const ERROR_LIST_CLASS: &str = "till-payments-error-list";

/// Messages rendered into the payment form's error container.
#[derive(Properties, PartialEq, Clone)]
pub struct ErrorListProps {
    pub messages: Vec<String>,
}

/// `<ul class="till-payments-error-list">` with one `<li>` per non-empty message.
/// Renders nothing when no message remains.
#[function_component(ErrorList)]
pub fn error_list(props: &ErrorListProps) -> Html {
    let items: Vec<&String> = props.messages.iter().filter(|m| !m.is_empty()).collect();
    if items.is_empty() {
        return Html::default();
    }

    html! {
        <ul class={ERROR_LIST_CLASS}>
            { for items.into_iter().map(|message| html! { <li>{ message }</li> }) }
        </ul>
    }
}
