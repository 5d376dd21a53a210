use actix_web::{HttpMessage, HttpRequest};

use crate::domain::filter::FormFields;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Query string pairs followed by the urlencoded body, if the request has one.
pub fn read_form(req: &HttpRequest, body: &[u8]) -> FormFields {
    let mut form = parse_urlencoded(req.query_string().as_bytes());

    let content_type = req.content_type();
    let is_form = content_type.is_empty() || content_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE);
    if !body.is_empty() && is_form {
        form.extend(parse_urlencoded(body));
    }

    form
}

fn parse_urlencoded(input: &[u8]) -> FormFields {
    FormFields::from_pairs(url::form_urlencoded::parse(input).into_owned())
}
