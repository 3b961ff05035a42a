use crate::error::{Result, TemplateError};
use crate::options::Delimiters;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Directive(RawDirective<'a>),
}

/// A `{{...}}` span. Offsets are byte positions in the scanned source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawDirective<'a> {
    pub body: &'a str,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub end_line: usize,
}

struct LineCounter<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl LineCounter<'_> {
    /// Offsets must be requested in increasing order.
    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.src[self.pos..offset].matches('\n').count();
        self.pos = offset;
        self.line
    }
}

/// Splits `src` into literal runs and directives. `base_line` is the line
/// on which `src` starts in the full template.
pub(crate) fn scan<'a>(
    src: &'a str,
    delimiters: &Delimiters,
    base_line: usize,
) -> Result<Vec<Segment<'a>>> {
    let left = delimiters.left.as_str();
    let right = delimiters.right.as_str();
    let mut lines = LineCounter {
        src,
        pos: 0,
        line: base_line,
    };
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let next_left = rest.find(left).map(|i| pos + i);
        let next_right = rest.find(right).map(|i| pos + i);

        if let Some(r) = next_right {
            if next_left.is_none_or(|l| r < l) {
                let line = lines.line_at(r);
                return Err(TemplateError::syntax(
                    line,
                    format!("unexpected right delimiter \"{}\"", right),
                ));
            }
        }

        let Some(start) = next_left else {
            segments.push(Segment::Text(rest));
            break;
        };
        if start > pos {
            segments.push(Segment::Text(&src[pos..start]));
        }

        let line = lines.line_at(start);
        let body_start = start + left.len();
        let close = src[body_start..].find(right).map(|i| body_start + i);
        let Some(close) = close else {
            return Err(TemplateError::syntax(line, "unterminated directive"));
        };
        if src[body_start..close].contains(left) {
            return Err(TemplateError::syntax(
                line,
                format!("unterminated directive before \"{}\"", left),
            ));
        }

        let end = close + right.len();
        segments.push(Segment::Directive(RawDirective {
            body: &src[body_start..close],
            start,
            end,
            line,
            end_line: lines.line_at(end),
        }));
        pos = end;
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_default(src: &str) -> Result<Vec<Segment<'_>>> {
        scan(src, &Delimiters::default(), 1)
    }

    #[test]
    fn test_scan_text_only() {
        let segments = scan_default("hello world").unwrap();
        assert_eq!(segments, vec![Segment::Text("hello world")]);
    }

    #[test]
    fn test_scan_directives() {
        let segments = scan_default("a{{ name }}b{{/if}}").unwrap();
        assert_eq!(segments.len(), 4);
        match &segments[1] {
            Segment::Directive(d) => {
                assert_eq!(d.body, " name ");
                assert_eq!((d.start, d.end), (1, 11));
            }
            other => panic!("Expected directive, got {:?}", other),
        }
        match &segments[3] {
            Segment::Directive(d) => assert_eq!(d.body, "/if"),
            other => panic!("Expected directive, got {:?}", other),
        }
    }

    #[test]
    fn test_line_numbers() {
        let segments = scan_default("a\nb\n{{x}}\n{{y\n}}").unwrap();
        let lines: Vec<(usize, usize)> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Directive(d) => Some((d.line, d.end_line)),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![(3, 3), (4, 5)]);
    }

    #[test]
    fn test_unexpected_right_delimiter() {
        let err = scan_default("ok\nstray }} here").unwrap_err();
        assert_eq!(
            err,
            TemplateError::Syntax {
                line: 2,
                message: "unexpected right delimiter \"}}\"".into()
            }
        );
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            scan_default("{{name"),
            Err(TemplateError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            scan_default("{{a {{b}}"),
            Err(TemplateError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_custom_delimiters() {
        let d = Delimiters::new("<%", "%>");
        let segments = scan("x<%a%>{{b}}", &d, 1).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], Segment::Text("{{b}}"));
    }
}
