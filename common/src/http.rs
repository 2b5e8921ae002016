//! Wire-level pieces of the provisioning portal: request-line splitting,
//! the fixed ordered route table, named header extraction, and the canned
//! response header blocks.

/// Canned status-line + header blocks. Dynamic JSON bodies and static
/// assets are delimited by connection close; only the error blocks carry
/// an explicit zero content length.
pub const HDR_HTML: &str = "HTTP/1.1 200 OK\nContent-type: text/html\n\n";
pub const HDR_CSS: &str =
    "HTTP/1.1 200 OK\nContent-type: text/css\nCache-Control: public, max-age=31536000\n\n";
pub const HDR_JS: &str = "HTTP/1.1 200 OK\nContent-type: text/javascript\n\n";
pub const HDR_JSON_NO_CACHE: &str = "HTTP/1.1 200 OK\nContent-type: application/json\nCache-Control: no-store, no-cache, must-revalidate, max-age=0\nPragma: no-cache\n\n";
pub const HDR_400: &str = "HTTP/1.1 400 Bad Request\nContent-Length: 0\n\n";
pub const HDR_404: &str = "HTTP/1.1 404 Not Found\nContent-Length: 0\n\n";
pub const HDR_503: &str = "HTTP/1.1 503 Service Unavailable\nContent-Length: 0\n\n";

pub const HEADER_SSID: &str = "X-Custom-ssid";
pub const HEADER_PASSWORD: &str = "X-Custom-pwd";
pub const HEADER_NAME: &str = "X-Custom-name";
pub const HEADER_EMAIL: &str = "X-Custom-email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteId {
    Index,
    JqueryJs,
    CodeJs,
    StyleCss,
    ApList,
    Status,
    RegistrationInfo,
    Connect,
    Disconnect,
    Register,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub id: RouteId,
}

/// Fixed, ordered, first-match-wins. Matching appends a trailing-space
/// sentinel to method + path so `/` never swallows `/code.js`.
pub const ROUTE_TABLE: &[Route] = &[
    Route { method: "GET", path: "/", id: RouteId::Index },
    Route { method: "GET", path: "/jquery.js", id: RouteId::JqueryJs },
    Route { method: "GET", path: "/code.js", id: RouteId::CodeJs },
    Route { method: "GET", path: "/style.css", id: RouteId::StyleCss },
    Route { method: "GET", path: "/ap.json", id: RouteId::ApList },
    Route { method: "GET", path: "/status.json", id: RouteId::Status },
    Route { method: "GET", path: "/register.json", id: RouteId::RegistrationInfo },
    Route { method: "POST", path: "/connect.json", id: RouteId::Connect },
    Route { method: "DELETE", path: "/connect.json", id: RouteId::Disconnect },
    Route { method: "POST", path: "/register.json", id: RouteId::Register },
];

/// Splits a raw request buffer into the request line (without the line
/// terminator) and the remainder. An unterminated buffer still counts as
/// a line; only an empty one does not — the empty-request case.
pub fn split_request(buf: &str) -> Option<(&str, &str)> {
    let (line, rest) = match buf.find('\n') {
        Some(newline) => (&buf[..newline], &buf[newline + 1..]),
        None => (buf, ""),
    };
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }
    Some((line, rest))
}

pub fn match_route(line: &str) -> Option<RouteId> {
    for route in ROUTE_TABLE {
        let sentinel_len = route.method.len() + 1 + route.path.len() + 1;
        let mut pattern = String::with_capacity(sentinel_len);
        pattern.push_str(route.method);
        pattern.push(' ');
        pattern.push_str(route.path);
        pattern.push(' ');

        if line.contains(&pattern) {
            return Some(route.id);
        }
    }
    None
}

/// Looks up a named header in the region after the request line and
/// returns its value up to the next line terminator. The lookup never
/// allocates a copy of the value and never crosses a line boundary.
pub fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}: ");
    let start = headers.find(&needle)? + needle.len();
    let rest = &headers[start..];
    let end = rest
        .find(|c| c == '\r' || c == '\n')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Bounded variant used for credential fields: present and within the
/// caller's maximum, or nothing. Oversized values are rejected outright,
/// never truncated.
pub fn bounded_header<'a>(headers: &'a str, name: &str, max_len: usize) -> Option<&'a str> {
    header_value(headers, name).filter(|value| value.len() <= max_len)
}
