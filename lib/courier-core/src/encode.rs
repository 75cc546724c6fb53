//! Request encoding.
//!
//! [`encode`] turns a [`RequestSpec`] into a [`Request`]: it validates the
//! method and URL, injects default headers, serializes the body according to
//! the content type and merges cookies. It performs no I/O; a spec that fails
//! here never reaches a transport.

use std::collections::btree_map::Entry;

use bytes::Bytes;

use crate::{
    ContentType, DEFAULT_USER_AGENT, Error, Form, FormField, HeaderValue, Headers, Method,
    Payload, Request, RequestSpec, Result,
};

const USER_AGENT: &str = "User-Agent";
const CONTENT_TYPE: &str = "Content-Type";
const COOKIE: &str = "Cookie";

/// Encode a request description into a ready-to-send request.
///
/// Steps, in order:
/// 1. the method must be set, else [`Error::EmptyMethod`];
/// 2. the URL must parse, else [`Error::InvalidUrl`];
/// 3. `User-Agent` defaults to [`DEFAULT_USER_AGENT`];
/// 4. the body is serialized per content type, and `Content-Type` is set
///    unless the caller already did (multipart always sets it, since the
///    boundary must match);
/// 5. cookies are joined into the `Cookie` header.
///
/// Without a content type, a GET request sends a [`Params`](crate::Params)
/// body in the query string, appended after any existing query.
///
/// # Errors
///
/// Returns the first validation or serialization error.
///
/// # Example
///
/// ```
/// use courier_core::{encode, RequestSpec};
///
/// let request = encode(
///     RequestSpec::builder("http://example.com/search")
///         .get()
///         .param("q", "rust lang")
///         .build(),
/// )
/// .expect("valid spec");
///
/// assert_eq!(request.url().as_str(), "http://example.com/search?q=rust+lang");
/// assert!(request.body().is_empty());
/// ```
pub fn encode(spec: RequestSpec) -> Result<Request> {
    let RequestSpec {
        url,
        method,
        content_type,
        body,
        mut headers,
        cookies,
    } = spec;

    let method = method.ok_or(Error::EmptyMethod)?;
    let mut url = url::Url::parse(&url)?;

    insert_absent(&mut headers, USER_AGENT, DEFAULT_USER_AGENT);

    let body = match body {
        Some(payload) => encode_body(method, content_type, payload, &mut url, &mut headers)?,
        None => Bytes::new(),
    };

    if let Some(cookies) = cookies {
        append_cookies(&mut headers, cookies.header_value());
    }

    Ok(Request::new(method, url, headers, body))
}

fn encode_body(
    method: Method,
    content_type: Option<ContentType>,
    payload: Payload,
    url: &mut url::Url,
    headers: &mut Headers,
) -> Result<Bytes> {
    let Some(content_type) = content_type else {
        return match method {
            Method::Get => {
                append_query(url, payload)?;
                Ok(Bytes::new())
            }
            Method::Post => Err(Error::UnsupportedContentType { method }),
        };
    };

    let body = match (content_type, payload) {
        (ContentType::Json, Payload::Text(text)) => Bytes::from(text),
        (ContentType::Json, Payload::Structured(value)) => value.to_json()?,
        (ContentType::Json, Payload::Params(params)) => crate::to_json(&params)?,

        (ContentType::Xml, Payload::Text(text)) => Bytes::from(text),
        (ContentType::Xml, Payload::Structured(value)) => Bytes::from(value.to_xml()?),

        (ContentType::Text, Payload::Text(text)) => Bytes::from(text),

        (ContentType::UrlEncoded, Payload::Params(params)) => crate::to_form(&params.to_pairs())?,
        (ContentType::UrlEncoded, _) => return Err(Error::InvalidMapPayload),

        (ContentType::Form, Payload::Field(field)) => return encode_form(vec![field], headers),
        (ContentType::Form, Payload::Fields(fields)) => return encode_form(fields, headers),
        (ContentType::Form, other) => {
            return Err(Error::InvalidFormPayload(format!(
                "expected form fields, got {}",
                other.kind()
            )));
        }

        (content_type, _) => return Err(Error::UnsupportedBodyType { content_type }),
    };

    insert_absent(headers, CONTENT_TYPE, content_type.as_str());
    Ok(body)
}

fn encode_form(fields: Vec<FormField>, headers: &mut Headers) -> Result<Bytes> {
    let (content_type, body) = Form::from_fields(fields)?.into_body();
    headers.insert(CONTENT_TYPE.to_string(), HeaderValue::One(content_type));
    Ok(body)
}

fn append_query(url: &mut url::Url, payload: Payload) -> Result<()> {
    let Payload::Params(params) = payload else {
        return Err(Error::InvalidMapPayload);
    };
    if params.is_empty() {
        return Ok(());
    }

    url.query_pairs_mut().extend_pairs(params.to_pairs());
    Ok(())
}

fn insert_absent(headers: &mut Headers, name: &str, value: &str) {
    if !headers.contains_key(name) {
        headers.insert(name.to_string(), HeaderValue::from(value));
    }
}

fn append_cookies(headers: &mut Headers, value: String) {
    if value.is_empty() {
        return;
    }
    match headers.entry(COOKIE.to_string()) {
        Entry::Vacant(entry) => {
            entry.insert(HeaderValue::One(value));
        }
        Entry::Occupied(mut entry) => match entry.get_mut() {
            HeaderValue::One(existing) if existing.is_empty() => *existing = value,
            HeaderValue::One(existing) => {
                existing.push_str("; ");
                existing.push_str(&value);
            }
            HeaderValue::Many(values) => values.push(value),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Cookie, Cookies, FieldKind, Params};

    fn post(content_type: ContentType, body: impl Into<Payload>) -> RequestSpec {
        RequestSpec::builder("http://example.com/api")
            .post()
            .content_type(content_type)
            .body(body)
            .build()
    }

    /// Splits a multipart body into `(headers, data)` per part.
    fn parse_multipart(content_type: &str, body: &[u8]) -> Vec<(String, String)> {
        let boundary = content_type
            .split_once("boundary=")
            .map(|(_, b)| b)
            .expect("boundary parameter");
        let body = String::from_utf8(body.to_vec()).expect("utf-8 body");
        let delimiter = format!("--{boundary}");

        let mut sections = body.split(delimiter.as_str());
        assert_eq!(sections.next(), Some(""), "body starts with a delimiter");
        sections
            .take_while(|section| !section.starts_with("--"))
            .map(|section| {
                let section = section
                    .strip_prefix("\r\n")
                    .and_then(|s| s.strip_suffix("\r\n"))
                    .expect("part framed by CRLF");
                let (head, data) = section.split_once("\r\n\r\n").expect("part header");
                (head.to_string(), data.to_string())
            })
            .collect()
    }

    #[test]
    fn missing_method_is_rejected_first() {
        let spec = RequestSpec {
            url: "not a url".to_string(),
            ..RequestSpec::default()
        };
        let_assert!(Err(Error::EmptyMethod) = encode(spec));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let spec = RequestSpec::builder("::not a url::").get().build();
        let_assert!(Err(Error::InvalidUrl(_)) = encode(spec));
    }

    #[test]
    fn default_user_agent_is_injected() {
        let request = encode(RequestSpec::builder("http://h/").get().build()).expect("encode");
        check!(request.header("User-Agent") == Some(DEFAULT_USER_AGENT));
        check!(request.header("Content-Type").is_none());
        check!(request.body().is_empty());
    }

    #[test]
    fn caller_user_agent_is_kept() {
        let spec = RequestSpec::builder("http://h/")
            .get()
            .header("User-Agent", "custom/1.0")
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("User-Agent") == Some("custom/1.0"));
    }

    #[test]
    fn json_structured_round_trips() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Order {
            id: u64,
            items: Vec<String>,
        }

        let spec = RequestSpec::builder("http://h/orders")
            .post()
            .json(Order {
                id: 7,
                items: vec!["tea".to_string()],
            })
            .build();
        let request = encode(spec).expect("encode");

        check!(request.header("Content-Type") == Some("application/json"));
        let decoded: Order = serde_json::from_slice(request.body()).expect("json body");
        check!(
            decoded
                == Order {
                    id: 7,
                    items: vec!["tea".to_string()]
                }
        );
    }

    #[test]
    fn json_string_is_sent_verbatim() {
        let raw = r#"{ "already":   "encoded" }"#;
        let request = encode(post(ContentType::Json, raw)).expect("encode");
        check!(request.body().as_ref() == raw.as_bytes());
    }

    #[test]
    fn json_params_serialize_as_object() {
        let params = Params::new().with("b", 2).with("a", "x");
        let request = encode(post(ContentType::Json, params)).expect("encode");
        check!(request.body().as_ref() == br#"{"a":"x","b":2}"#);
    }

    #[test]
    fn json_rejects_form_fields() {
        let spec = post(ContentType::Json, FormField::text("a", "1"));
        let_assert!(
            Err(Error::UnsupportedBodyType {
                content_type: ContentType::Json
            }) = encode(spec)
        );
    }

    #[test]
    fn caller_content_type_is_kept() {
        let spec = RequestSpec::builder("http://h/")
            .post()
            .header("Content-Type", "application/vnd.api+json")
            .json_str("{}")
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("Content-Type") == Some("application/vnd.api+json"));
    }

    #[test]
    fn header_keys_match_exactly() {
        let spec = RequestSpec::builder("http://h/")
            .post()
            .header("content-type", "application/custom")
            .json_str("{}")
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("content-type") == Some("application/custom"));
        check!(request.header("Content-Type") == Some("application/json"));
    }

    #[test]
    fn xml_structured_and_verbatim() {
        #[derive(serde::Serialize)]
        struct Note {
            to: String,
        }

        let spec = RequestSpec::builder("http://h/")
            .post()
            .xml(Note {
                to: "Bob".to_string(),
            })
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("Content-Type") == Some("application/xml"));
        check!(request.body().as_ref() == b"<Note><to>Bob</to></Note>");

        let request = encode(post(ContentType::Xml, "<a/>")).expect("encode");
        check!(request.body().as_ref() == b"<a/>");
    }

    #[test]
    fn xml_rejects_params_and_propagates_marshal_errors() {
        let_assert!(
            Err(Error::UnsupportedBodyType { .. }) =
                encode(post(ContentType::Xml, Params::new().with("a", "1")))
        );

        let mut map = BTreeMap::new();
        map.insert("k", "v");
        let spec = RequestSpec::builder("http://h/").post().xml(map).build();
        let_assert!(Err(Error::XmlSerialization(_)) = encode(spec));
    }

    #[test]
    fn text_accepts_only_strings() {
        let request = encode(post(ContentType::Text, "hello")).expect("encode");
        check!(request.header("Content-Type") == Some("text/plain"));
        check!(request.body().as_ref() == b"hello");

        let_assert!(
            Err(Error::UnsupportedBodyType {
                content_type: ContentType::Text
            }) = encode(post(ContentType::Text, Payload::structured(42)))
        );
    }

    #[test]
    fn urlencoded_lists_use_bracketed_keys() {
        let params = Params::new()
            .with("tags", vec!["x", "y z"])
            .with("id", 5)
            .with("ratio", 0.25);
        let request = encode(post(ContentType::UrlEncoded, params)).expect("encode");
        check!(request.header("Content-Type") == Some("application/x-www-form-urlencoded"));
        check!(request.body().as_ref() == b"id=5&ratio=0.25&tags%5B%5D=x&tags%5B%5D=y+z");
    }

    #[test]
    fn urlencoded_requires_params() {
        let_assert!(
            Err(Error::InvalidMapPayload) = encode(post(ContentType::UrlEncoded, "a=1"))
        );
    }

    #[test]
    fn multipart_parts_in_order() {
        let spec = RequestSpec::builder("http://h/upload")
            .post()
            .form_text("a", "1")
            .form_file("file", "f.txt", "hi")
            .build();
        let request = encode(spec).expect("encode");

        let_assert!(Some(content_type) = request.header("Content-Type"));
        check!(content_type.starts_with("multipart/form-data; boundary="));

        let parts = parse_multipart(content_type, request.body());
        check!(parts.len() == 2);
        check!(parts[0].0 == "Content-Disposition: form-data; name=\"a\"");
        check!(parts[0].1 == "1");
        check!(parts[1].0.starts_with("Content-Disposition: form-data; name=\"file\"; filename=\"f.txt\""));
        check!(parts[1].1 == "hi");
    }

    #[test]
    fn multipart_overwrites_content_type() {
        let spec = RequestSpec::builder("http://h/upload")
            .post()
            .header("Content-Type", "multipart/form-data")
            .body(FormField::text("a", "1"))
            .content_type(ContentType::Form)
            .build();
        let request = encode(spec).expect("encode");
        let_assert!(Some(content_type) = request.header("Content-Type"));
        check!(content_type.contains("boundary="));
    }

    #[test]
    fn multipart_rejects_other_payloads() {
        let_assert!(Err(Error::InvalidFormPayload(_)) = encode(post(ContentType::Form, "a=1")));

        let nameless = FormField {
            name: "upload".to_string(),
            kind: FieldKind::File,
            value: Bytes::from_static(b"x"),
            file_name: None,
        };
        let_assert!(Err(Error::InvalidFormPayload(_)) = encode(post(ContentType::Form, nameless)));
    }

    #[test]
    fn get_params_append_to_query() {
        let spec = RequestSpec::builder("http://h/x")
            .get()
            .param("a", 1)
            .param("b", 2)
            .build();
        let request = encode(spec).expect("encode");
        let url = request.url().as_str();
        check!(url.starts_with("http://h/x?"));
        check!(url.contains("a=1"));
        check!(url.contains("b=2"));
        check!(request.body().is_empty());
    }

    #[test]
    fn get_params_extend_existing_query() {
        let spec = RequestSpec::builder("http://h/x?page=1")
            .get()
            .param("tags", vec!["p", "q"])
            .build();
        let request = encode(spec).expect("encode");
        check!(request.url().as_str() == "http://h/x?page=1&tags%5B%5D=p&tags%5B%5D=q");
    }

    #[test]
    fn get_params_are_percent_encoded() {
        let spec = RequestSpec::builder("http://h/x")
            .get()
            .param("q", "a&b=c d")
            .build();
        let request = encode(spec).expect("encode");
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        check!(pairs == vec![("q".to_string(), "a&b=c d".to_string())]);
    }

    #[test]
    fn get_without_content_type_requires_params() {
        let spec = RequestSpec::builder("http://h/").get().body("raw").build();
        let_assert!(Err(Error::InvalidMapPayload) = encode(spec));
    }

    #[test]
    fn post_without_content_type_is_rejected() {
        let spec = RequestSpec::builder("http://h/")
            .post()
            .param("a", "1")
            .build();
        let_assert!(
            Err(Error::UnsupportedContentType {
                method: Method::Post
            }) = encode(spec)
        );
    }

    #[test]
    fn post_without_body_needs_no_content_type() {
        let request = encode(RequestSpec::builder("http://h/").post().build()).expect("encode");
        check!(request.body().is_empty());
    }

    #[test]
    fn cookies_join_into_one_header() {
        let spec = RequestSpec::builder("http://h/")
            .get()
            .cookies(vec![Cookie::new("a", "1"), Cookie::new("b", "2")])
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("Cookie") == Some("a=1; b=2"));
    }

    #[test]
    fn cookies_append_to_caller_header() {
        let spec = RequestSpec::builder("http://h/")
            .get()
            .header("Cookie", "pre=0")
            .cookies(Cookies::Raw("a=1".to_string()))
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("Cookie") == Some("pre=0; a=1"));
    }

    #[test]
    fn empty_cookie_map_sets_nothing() {
        let spec = RequestSpec::builder("http://h/")
            .get()
            .cookies(BTreeMap::<String, String>::new())
            .build();
        let request = encode(spec).expect("encode");
        check!(request.header("Cookie").is_none());
    }
}
