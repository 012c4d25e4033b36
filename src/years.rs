/// Release span of an OMDb title. Series carry a range such as `2010–2015`,
/// or an open range `2010–` while still running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearSpan {
    pub start: i16,
    pub end: Option<i16>,
}

pub fn parse_year_span(raw: &str) -> Option<YearSpan> {
    let s = raw.trim();
    let (start, rest) = match s.find(['–', '-', '—']) {
        Some(pos) => {
            let dash_len = s[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
            (&s[..pos], Some(s[pos + dash_len..].trim()))
        },
        None => (s, None),
    };

    let start = parse_four_digits(start.trim())?;
    let end = match rest {
        None | Some("") => None,
        Some(end) => Some(parse_four_digits(end)?),
    };

    if end.is_some_and(|end| end < start) {
        return None;
    }

    Some(YearSpan { start, end })
}

pub fn parse_start_year(raw: &str) -> Option<i16> {
    parse_year_span(raw).map(|span| span.start)
}

fn parse_four_digits(s: &str) -> Option<i16> {
    if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
