//! Property-based tests for escaping and selector output.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use proptest::prelude::*;
use trellis_core::{el, render_to_string, Context, Node};

fn render_static(node: Node) -> String {
    let mut ctx = Context::new_static("en");
    render_to_string(&node, &mut ctx).unwrap()
}

/// What a browser tokenizer sees in a rendered fragment.
#[derive(Default)]
struct Parsed {
    text: String,
    start_tags: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl TokenSink for Parsed {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => self.text.push_str(&text),
            Token::TagToken(tag) if tag.kind == TagKind::StartTag => {
                self.start_tags.push(tag.name.to_string());
                self.attrs.extend(
                    tag.attrs
                        .into_iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string())),
                );
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

fn parse(html: &str) -> Parsed {
    let mut queue = BufferQueue::new();
    queue.push_back(StrTendril::from_slice(html));
    let mut tokenizer = Tokenizer::new(Parsed::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();
    tokenizer.sink
}

proptest! {
    /// Property: escaped text parses back to itself without opening any tag
    #[test]
    fn text_escaping_round_trips(text in "[^\\p{Cc}]*") {
        let parsed = parse(&render_static(el("p").child(text.clone()).into()));
        prop_assert_eq!(parsed.start_tags, vec!["p".to_string()]);
        prop_assert_eq!(parsed.text, text);
    }

    /// Property: attribute values never break out of their quotes
    #[test]
    fn attribute_values_stay_quoted(value in "[^\\p{Cc}]+") {
        let parsed = parse(&render_static(el("p").attr("title", value.as_str()).into()));
        prop_assert_eq!(parsed.start_tags, vec!["p".to_string()]);
        prop_assert_eq!(parsed.attrs, vec![("title".to_string(), value)]);
        prop_assert_eq!(parsed.text, "");
    }

    /// Property: one id attribute and one class attribute listing classes in order
    #[test]
    fn selector_emits_single_id_and_class(
        id in "[a-z][a-z0-9-]{0,8}",
        classes in prop::collection::vec("[a-z][a-z0-9_-]{0,6}", 0..5),
    ) {
        let mut selector = format!("section#{id}");
        for class in &classes {
            selector.push('.');
            selector.push_str(class);
        }
        let html = render_static(el(selector).into());
        let open = &html[..html.find('>').expect("opening tag")];

        prop_assert_eq!(open.matches(" id=\"").count(), 1);
        if classes.is_empty() {
            prop_assert_eq!(open.matches(" class=\"").count(), 0);
        } else {
            prop_assert_eq!(open.matches(" class=\"").count(), 1);
            let expected = format!(" class=\"{}\"", classes.join(" "));
            prop_assert!(open.contains(&expected));
        }
    }

    /// Property: void elements never close, whatever their children
    #[test]
    fn void_elements_never_close(
        tag in prop::sample::select(
            vec!["img", "input", "br", "hr", "meta", "link", "source", "area"]
        ),
        children in prop::collection::vec(".*", 0..4),
    ) {
        let html = render_static(el(tag).children(children).into());
        prop_assert_eq!(html, format!("<{tag}>"));
    }
}
