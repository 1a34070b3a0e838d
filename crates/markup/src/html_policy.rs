//! Static end-tag policy for HTML element names.
//!
//! Names are expected lower-cased. Anything not listed here is `Undefined`
//! and treated as an XML-ish element: honour `/>` and search for a matching
//! end tag without complaining when there is none.

/// Set of element names, either listed or "everything except".
#[derive(Clone, Copy, Debug)]
pub(crate) enum NameSet {
    Only(&'static [&'static str]),
    AllExcept(&'static [&'static str]),
}

impl NameSet {
    pub(crate) fn contains(self, name: &str) -> bool {
        match self {
            NameSet::Only(names) => names.iter().any(|n| *n == name),
            NameSet::AllExcept(names) => !names.iter().any(|n| *n == name),
        }
    }
}

/// How an element with an optional end tag is implicitly closed.
#[derive(Debug)]
pub(crate) struct OptionalEnd {
    /// Start tags that close the element.
    pub terminating_start: NameSet,
    /// End tags that close the element.
    pub terminating_end: NameSet,
    /// Start tags whose whole element is skipped while searching.
    pub nonterminating: NameSet,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum EndTagPolicy {
    /// Void element; never has an end tag.
    Forbidden,
    Required,
    Optional(&'static OptionalEnd),
    /// Not an HTML element.
    Undefined,
}

impl EndTagPolicy {
    /// Whether `/>` is ignored for this policy.
    pub(crate) fn ignores_self_closing_syntax(self) -> bool {
        matches!(self, EndTagPolicy::Required | EndTagPolicy::Optional(_))
    }
}

const NONE: NameSet = NameSet::Only(&[]);

const LIST_CONTAINERS: &[&str] = &["ul", "ol", "menu", "dir"];

const P_TERMINATING_START: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "center", "col", "colgroup", "dd",
    "details", "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer",
    "form", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "li",
    "listing", "main", "menu", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "td", "tfoot", "th", "thead", "tr", "ul", "xmp",
];

const P_TERMINATING_END: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "button", "caption", "center", "dd",
    "del", "details", "dialog", "div", "dt", "fieldset", "figcaption", "figure", "footer", "form",
    "header", "html", "ins", "li", "main", "map", "nav", "noscript", "object", "section", "td",
    "th", "video", "audio",
];

const TABLE_SECTIONS: &[&str] = &["tbody", "thead", "tfoot"];

const HEAD_CONTENT: &[&str] = &[
    "base", "basefont", "bgsound", "link", "meta", "noscript", "object", "script", "style",
    "template", "title",
];

static LI: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["li"]),
    terminating_end: NameSet::Only(LIST_CONTAINERS),
    nonterminating: NameSet::Only(LIST_CONTAINERS),
};

static DD_DT: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["dd", "dt"]),
    terminating_end: NameSet::Only(&["dl"]),
    nonterminating: NameSet::Only(&["dl"]),
};

static P: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(P_TERMINATING_START),
    terminating_end: NameSet::Only(P_TERMINATING_END),
    nonterminating: NONE,
};

static OPTION: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["option", "optgroup"]),
    terminating_end: NameSet::Only(&["select", "optgroup", "datalist"]),
    nonterminating: NONE,
};

static OPTGROUP: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["optgroup"]),
    terminating_end: NameSet::Only(&["select"]),
    nonterminating: NONE,
};

static TR: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["tr", "tbody", "thead", "tfoot"]),
    terminating_end: NameSet::Only(&["table", "tbody", "thead", "tfoot"]),
    nonterminating: NameSet::Only(&["table"]),
};

static TD_TH: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["td", "th", "tr", "tbody", "thead", "tfoot"]),
    terminating_end: NameSet::Only(&["tr", "table", "tbody", "thead", "tfoot"]),
    nonterminating: NameSet::Only(&["table"]),
};

static TABLE_SECTION: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(TABLE_SECTIONS),
    terminating_end: NameSet::Only(&["table"]),
    nonterminating: NameSet::Only(&["table"]),
};

static COLGROUP: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["colgroup", "caption", "thead", "tbody", "tfoot", "tr"]),
    terminating_end: NameSet::Only(&["table"]),
    nonterminating: NONE,
};

static RUBY_ANNOTATION: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["rb", "rp", "rt", "rtc"]),
    terminating_end: NameSet::Only(&["ruby", "rtc"]),
    nonterminating: NONE,
};

static RTC: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::Only(&["rb", "rtc"]),
    terminating_end: NameSet::Only(&["ruby"]),
    nonterminating: NONE,
};

static HEAD: OptionalEnd = OptionalEnd {
    terminating_start: NameSet::AllExcept(HEAD_CONTENT),
    terminating_end: NameSet::Only(&["html"]),
    nonterminating: NONE,
};

static BODY: OptionalEnd = OptionalEnd {
    terminating_start: NONE,
    terminating_end: NameSet::Only(&["html"]),
    nonterminating: NONE,
};

static HTML: OptionalEnd = OptionalEnd {
    terminating_start: NONE,
    terminating_end: NONE,
    nonterminating: NONE,
};

pub(crate) fn end_tag_policy(name: &str) -> EndTagPolicy {
    match name {
        "area" | "base" | "basefont" | "bgsound" | "br" | "col" | "embed" | "frame" | "hr"
        | "img" | "input" | "isindex" | "keygen" | "link" | "meta" | "param" | "source"
        | "track" | "wbr" => EndTagPolicy::Forbidden,
        "li" => EndTagPolicy::Optional(&LI),
        "dd" | "dt" => EndTagPolicy::Optional(&DD_DT),
        "p" => EndTagPolicy::Optional(&P),
        "option" => EndTagPolicy::Optional(&OPTION),
        "optgroup" => EndTagPolicy::Optional(&OPTGROUP),
        "tr" => EndTagPolicy::Optional(&TR),
        "td" | "th" => EndTagPolicy::Optional(&TD_TH),
        "thead" | "tbody" | "tfoot" => EndTagPolicy::Optional(&TABLE_SECTION),
        "colgroup" => EndTagPolicy::Optional(&COLGROUP),
        "rb" | "rp" | "rt" => EndTagPolicy::Optional(&RUBY_ANNOTATION),
        "rtc" => EndTagPolicy::Optional(&RTC),
        "head" => EndTagPolicy::Optional(&HEAD),
        "body" => EndTagPolicy::Optional(&BODY),
        "html" => EndTagPolicy::Optional(&HTML),
        name if is_required_end_element(name) => EndTagPolicy::Required,
        _ => EndTagPolicy::Undefined,
    }
}

fn is_required_end_element(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "acronym"
            | "address"
            | "applet"
            | "article"
            | "aside"
            | "audio"
            | "b"
            | "bdi"
            | "bdo"
            | "big"
            | "blink"
            | "blockquote"
            | "button"
            | "canvas"
            | "caption"
            | "center"
            | "cite"
            | "code"
            | "data"
            | "datalist"
            | "del"
            | "details"
            | "dfn"
            | "dialog"
            | "dir"
            | "div"
            | "dl"
            | "em"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "font"
            | "footer"
            | "form"
            | "frameset"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "i"
            | "iframe"
            | "ins"
            | "kbd"
            | "label"
            | "legend"
            | "listing"
            | "main"
            | "map"
            | "mark"
            | "marquee"
            | "menu"
            | "meter"
            | "nav"
            | "nobr"
            | "noembed"
            | "noframes"
            | "noscript"
            | "object"
            | "ol"
            | "output"
            | "picture"
            | "pre"
            | "progress"
            | "q"
            | "ruby"
            | "s"
            | "samp"
            | "script"
            | "section"
            | "select"
            | "small"
            | "span"
            | "strike"
            | "strong"
            | "style"
            | "sub"
            | "summary"
            | "sup"
            | "table"
            | "template"
            | "textarea"
            | "time"
            | "title"
            | "tt"
            | "u"
            | "ul"
            | "var"
            | "video"
            | "xmp"
    )
}

/// Elements that may not contain another element of the same name.
pub(crate) fn forbids_self_nesting(name: &str) -> bool {
    matches!(name, "a" | "button" | "nobr")
}

/// Elements whose content is raw text: no tags other than their own end
/// tag (and comments) are recognized inside.
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "textarea" | "title" | "xmp")
}

/// Raw-text elements whose content still decodes character references.
pub(crate) fn decodes_references_in_content(name: &str) -> bool {
    matches!(name, "textarea" | "title")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_forbid_end_tags() {
        for name in ["br", "img", "input", "meta", "wbr"] {
            assert!(matches!(end_tag_policy(name), EndTagPolicy::Forbidden), "{name}");
        }
    }

    #[test]
    fn unknown_names_are_undefined() {
        assert!(matches!(end_tag_policy("my-widget"), EndTagPolicy::Undefined));
        assert!(matches!(end_tag_policy("svg"), EndTagPolicy::Undefined));
        assert!(!end_tag_policy("my-widget").ignores_self_closing_syntax());
        assert!(end_tag_policy("div").ignores_self_closing_syntax());
    }

    #[test]
    fn li_is_closed_by_sibling_and_parent_list() {
        let EndTagPolicy::Optional(li) = end_tag_policy("li") else {
            panic!("li must have an optional end tag");
        };
        assert!(li.terminating_start.contains("li"));
        assert!(!li.terminating_start.contains("p"));
        assert!(li.terminating_end.contains("ul"));
        assert!(li.nonterminating.contains("ol"));
    }

    #[test]
    fn head_is_closed_by_anything_but_head_content() {
        let EndTagPolicy::Optional(head) = end_tag_policy("head") else {
            panic!("head must have an optional end tag");
        };
        assert!(head.terminating_start.contains("body"));
        assert!(head.terminating_start.contains("div"));
        assert!(!head.terminating_start.contains("title"));
    }

    #[test]
    fn paragraph_closed_by_blocks() {
        let EndTagPolicy::Optional(p) = end_tag_policy("p") else {
            panic!("p must have an optional end tag");
        };
        assert!(p.terminating_start.contains("div"));
        assert!(p.terminating_start.contains("p"));
        assert!(!p.terminating_start.contains("span"));
        assert!(p.terminating_end.contains("div"));
    }
}
