/// Everything a custom template needs to render one honeypot widget:
/// field names, the per-render instance number, the two challenge operands,
/// and the sequence id to echo back in the hidden field.
#[derive(Debug, Clone, PartialEq)]
pub struct HoneypotStatus {
    pub honeypot: String,
    pub instance: u32,
    pub math: (u32, u32),
    pub script_class: String,
    pub script_src: String,
    pub sequence: String,
    pub seq_id: usize,
}

/// Form snippet: the hidden sequence-id input plus the disguised challenge.
/// Users with JavaScript see nothing; without it they get the math question.
/// Each rendered form needs its own snippet, ids are unique per instance.
pub(crate) fn honeypot_html(status: &HoneypotStatus, skip_script: bool) -> String {
    let HoneypotStatus {
        honeypot,
        instance,
        math: (first, second),
        script_class,
        script_src,
        sequence,
        seq_id,
    } = status;

    let mut html = format!(
        r#"<input type="hidden" name="{sequence}" value="{seq_id}">
<div id="{honeypot}_c{instance}" class="{script_class}" data-first="{first}" data-second="{second}">
    <label for="{honeypot}_i{instance}">What is {first} plus {second}?</label>
    <input type="text" id="{honeypot}_i{instance}" name="{honeypot}" autocomplete="off">
</div>"#
    );
    if !skip_script {
        html.push_str(&format!(r#"<script src="{script_src}"></script>"#));
    }
    html
}

/// The companion JavaScript, served from `script_src` so inline-script CSP
/// rules stay intact. Hides the widget and pre-fills the answer.
pub(crate) fn challenge_script(script_class: &str) -> String {
    format!(
        r#"(function () {{
    const joe = document.getElementsByClassName("{script_class}");
    if (joe) {{
        let foo, bar;
        for (let i = joe.length - 1; i >= 0; --i) {{
            foo = joe[i];

            foo.style.position   = "absolute";
            foo.style.height     = "11px";
            foo.style.width      = "11px";
            foo.style.textIndent = "11px";
            foo.style.overflow   = "hidden";
            foo.className        = "";

            bar = foo.getElementsByTagName("input")[0];
            if (bar) {{
                bar.tabIndex  = -1;
                bar.value     = parseInt(foo.getAttribute("data-first")) + parseInt(foo.getAttribute("data-second")).toString();
                bar.className = "";
            }}
        }}
    }}
}})();"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> HoneypotStatus {
        HoneypotStatus {
            honeypot: "age".into(),
            instance: 1,
            math: (10, 0),
            script_class: "fg-pn".into(),
            script_src: "/fg-pn.js".into(),
            sequence: "form_sequence".into(),
            seq_id: 3,
        }
    }

    #[test]
    fn html_carries_sequence_id_and_operands() {
        let html = honeypot_html(&status(), false);
        assert!(html.contains(r#"<input type="hidden" name="form_sequence" value="3">"#));
        assert!(html.contains(r#"data-first="10" data-second="0""#));
        assert!(html.contains("What is 10 plus 0?"));
        assert!(html.contains(r#"name="age""#));
        assert!(html.contains(r#"<script src="/fg-pn.js"></script>"#));
    }

    #[test]
    fn skip_script_omits_script_tag() {
        let html = honeypot_html(&status(), true);
        assert!(!html.contains("<script"));
    }

    #[test]
    fn instance_number_feeds_element_ids() {
        let mut s = status();
        s.instance = 7;
        let html = honeypot_html(&s, true);
        assert!(html.contains(r#"id="age_c7""#));
        assert!(html.contains(r#"id="age_i7""#));
    }

    #[test]
    fn script_targets_configured_class() {
        let js = challenge_script("custom-class");
        assert!(js.contains(r#"getElementsByClassName("custom-class")"#));
        assert!(js.contains("data-first"));
    }
}
