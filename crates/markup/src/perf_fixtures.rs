pub const BLOCK_TEMPLATE: &str =
    "<div class=box><p>hello &amp; bye<a href=\"/x?a=1&b=2\">link</a><br><!-- note --></div>";

pub fn make_blocks(blocks: usize) -> String {
    let mut markup = String::with_capacity(BLOCK_TEMPLATE.len() * blocks);
    for _ in 0..blocks {
        markup.push_str(BLOCK_TEMPLATE);
    }
    markup
}

/// Markup that only makes sense to a server-side engine, interleaved with
/// normal tags and attributes that embed server tags.
pub fn make_server_blocks(blocks: usize) -> String {
    let mut markup = String::with_capacity(64 * blocks);
    for i in 0..blocks {
        markup.push_str("<li class=\"<%= cls %>\"><% if x %>");
        markup.push_str(&i.to_string());
        markup.push_str("<% end %></li>");
    }
    markup
}

/// Many nested elements of the same name, closed at the end.
pub fn make_nested(depth: usize) -> String {
    let mut markup = String::with_capacity(11 * depth);
    for _ in 0..depth {
        markup.push_str("<div>");
    }
    for _ in 0..depth {
        markup.push_str("</div>");
    }
    markup
}
