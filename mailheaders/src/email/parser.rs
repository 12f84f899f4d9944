/*
 * mailheaders - parsers crate.
 *
 * Copyright 2017-2020 Manos Pitsidianakis
 *
 * This file is part of mailheaders.
 *
 * mailheaders is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * mailheaders is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with mailheaders. If not, see <http://www.gnu.org/licenses/>.
 */

//! Parsers for email. See submodules.
#![allow(clippy::type_complexity)]

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take, take_until, take_while, take_while1, take_while_m_n},
    character::is_digit,
    combinator::{map, opt, recognize},
    error::{context, ErrorKind},
    multi::{many0, many1, separated_list0},
    number::complete::le_u8,
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::{
    email::headers::HeaderName,
    error::{Error, Result, ResultIntoError},
};

macro_rules! is_ctl_or_space {
    ($var:expr) => {
        /* <any ASCII control character and DEL> */
        $var < 33 || $var == 127
    };
}

macro_rules! is_whitespace {
    ($var:expr) => {
        $var == b' ' || $var == b'\t' || $var == b'\n' || $var == b'\r'
    };
}

#[derive(Eq, PartialEq)]
pub struct ParsingError<I> {
    pub input: I,
    pub error: Cow<'static, str>,
}

impl std::fmt::Debug for ParsingError<&'_ [u8]> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("ParsingError")
            .field("input", &String::from_utf8_lossy(self.input))
            .field("error", &self.error)
            .finish()
    }
}

pub type IResult<I, O, E = ParsingError<I>> = std::result::Result<(I, O), nom::Err<E>>;

impl<I> From<(I, &'static str)> for ParsingError<I> {
    fn from((input, error): (I, &'static str)) -> Self {
        Self {
            input,
            error: error.into(),
        }
    }
}

impl<I> From<(I, String)> for ParsingError<I> {
    fn from((input, error): (I, String)) -> Self {
        Self {
            input,
            error: error.into(),
        }
    }
}

impl<I> nom::error::ParseError<I> for ParsingError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self {
            input,
            error: kind.description().to_string().into(),
        }
    }

    fn append(input: I, kind: ErrorKind, other: Self) -> Self {
        Self {
            input,
            error: format!("{}, {}", kind.description(), other.error).into(),
        }
    }
}

impl<I, E> nom::error::FromExternalError<I, E> for ParsingError<I> {
    fn from_external_error(input: I, kind: ErrorKind, _e: E) -> Self {
        Self {
            input,
            error: kind.description().to_string().into(),
        }
    }
}

impl<I> nom::error::ContextError<I> for ParsingError<I> {}

impl<'i> From<ParsingError<&'i [u8]>> for Error {
    fn from(val: ParsingError<&'i [u8]>) -> Self {
        Self::new("Parsing error")
            .set_summary(format!(
                r#"In input: "{}...",
Error: {}"#,
                String::from_utf8_lossy(val.input)
                    .chars()
                    .take(30)
                    .collect::<String>(),
                val.error
            ))
            .set_kind(crate::error::ErrorKind::Parse)
    }
}

impl<'i> From<nom::Err<ParsingError<&'i [u8]>>> for Error {
    fn from(val: nom::Err<ParsingError<&'i [u8]>>) -> Self {
        match val {
            nom::Err::Incomplete(_) => {
                Self::new("Parsing Error: Incomplete").set_kind(crate::error::ErrorKind::Parse)
            }
            nom::Err::Error(err) | nom::Err::Failure(err) => err.into(),
        }
    }
}

pub trait BytesExt {
    fn rtrim(&self) -> &Self;
    fn ltrim(&self) -> &Self;
    fn trim(&self) -> &Self;
    fn find<T: AsRef<[u8]>>(&self, needle: T) -> Option<usize>;
}

impl BytesExt for [u8] {
    fn rtrim(&self) -> &Self {
        if let Some(last) = self.iter().rposition(|b| !is_whitespace!(*b)) {
            &self[..=last]
        } else {
            &[]
        }
    }

    fn ltrim(&self) -> &Self {
        if let Some(first) = self.iter().position(|b| !is_whitespace!(*b)) {
            &self[first..]
        } else {
            &[]
        }
    }

    fn trim(&self) -> &[u8] {
        self.rtrim().ltrim()
    }

    fn find<T: AsRef<[u8]>>(&self, needle: T) -> Option<usize> {
        let needle = needle.as_ref();
        if needle.is_empty() {
            return None;
        }
        self.windows(needle.len())
            .position(|window| window == needle)
    }
}

/// A header field as it was found in a message, with the byte position of
/// its name relative to the start of the parsed input.
#[derive(Clone, Debug)]
pub struct RawHeader<'a> {
    pub name: HeaderName,
    /// Bytes after the colon, up to but excluding the line terminator.
    /// Folds are kept.
    pub raw_value: &'a [u8],
    pub offset: usize,
}

/// Splits a message into its header fields and body.
pub fn mail(input: &[u8]) -> Result<(Vec<RawHeader<'_>>, &[u8])> {
    let mut ret = vec![];
    let mut rest = input;
    loop {
        if rest.is_empty() {
            break;
        }
        if let Ok((body, ())) = generic::crlf(rest) {
            rest = body;
            break;
        }
        let offset = input.len() - rest.len();
        let (next, (name, raw_value)) = headers::header(rest).chain_err_summary(|| {
            format!("Could not parse header field at byte offset {}", offset)
        })?;
        ret.push(RawHeader {
            name,
            raw_value,
            offset,
        });
        rest = next;
    }

    Ok((ret, rest))
}

pub mod dates {
    //! Date values in headers.
    use super::{generic::*, *};
    use crate::utils::datetime::{timestamp_from_fields, TzOffset, UnixTimestamp};

    fn take_n_digits(n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
        move |input: &[u8]| {
            let (rest, ret) = take(n)(input)?;
            if !ret.iter().all(|c| is_digit(*c)) {
                return Err(nom::Err::Error(
                    (input, "take_n_digits(): not digits").into(),
                ));
            }
            Ok((rest, ret))
        }
    }

    fn digits_value(digits: &[u8]) -> u32 {
        digits
            .iter()
            .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'))
    }

    /// In the obsolete time zone, "UT" and "GMT" are indications of
    /// "Universal Time" and "Greenwich Mean Time", respectively, and are
    /// both semantically identical to "+0000".
    ///
    /// The remaining three character zones are the US time zones.  The first
    /// letter, "E", "C", "M", or "P" stands for "Eastern", "Central",
    /// "Mountain", and "Pacific".  The second letter is either "S" for
    /// "Standard" time, or "D" for "Daylight Savings" (or summer) time.
    ///
    /// Military and other alphabetic zones SHOULD be considered equivalent to
    /// "-0000" unless there is out-of-band information confirming their
    /// meaning.
    fn obs_zone(input: &[u8]) -> IResult<&[u8], TzOffset> {
        alt((
            map(tag_no_case("UT"), |_| 0),
            map(tag_no_case("GMT"), |_| 0),
            map(tag_no_case("EDT"), |_| -400),
            map(tag_no_case("EST"), |_| -500),
            map(tag_no_case("CDT"), |_| -500),
            map(tag_no_case("CST"), |_| -600),
            map(tag_no_case("MDT"), |_| -600),
            map(tag_no_case("MST"), |_| -700),
            map(tag_no_case("PDT"), |_| -700),
            map(tag_no_case("PST"), |_| -800),
            map(take_while1(|b: u8| b.is_ascii_alphabetic()), |_| 0),
        ))(input)
    }

    /// ```text
    /// zone            =   (FWS ( "+" / "-" ) 4DIGIT) / obs-zone
    /// ```
    fn zone(input: &[u8]) -> IResult<&[u8], TzOffset> {
        alt((numeric_zone, obs_zone))(input)
    }

    fn numeric_zone(input: &[u8]) -> IResult<&[u8], TzOffset> {
        let (input, sign) = alt((tag("+"), tag("-")))(input)?;
        let (input, zone) = take_n_digits(4)(input)?;
        let value = digits_value(zone) as TzOffset;
        Ok((input, if sign == b"-" { -value } else { value }))
    }

    /// ```text
    /// day-of-week     =   ([FWS] day-name) / obs-day-of-week
    /// day-name        =   "Mon" / "Tue" / "Wed" / "Thu" /
    ///                    "Fri" / "Sat" / "Sun"
    /// ```
    fn day_of_week(input: &[u8]) -> IResult<&[u8], &[u8]> {
        let (input, _) = opt(cfws)(input)?;
        alt((
            tag_no_case("Mon"),
            tag_no_case("Tue"),
            tag_no_case("Wed"),
            tag_no_case("Thu"),
            tag_no_case("Fri"),
            tag_no_case("Sat"),
            tag_no_case("Sun"),
        ))(input)
    }

    /// `day             =   ([FWS] 1*2DIGIT FWS) / obs-day`
    fn day(input: &[u8]) -> IResult<&[u8], u32> {
        let (input, _) = opt(cfws)(input)?;
        let (input, ret) = take_while_m_n(1, 2, is_digit)(input)?;
        Ok((input, digits_value(ret)))
    }

    /// ```text
    /// month           =   "Jan" / "Feb" / "Mar" / "Apr" /
    ///                    "May" / "Jun" / "Jul" / "Aug" /
    ///                    "Sep" / "Oct" / "Nov" / "Dec"
    /// ```
    fn month(input: &[u8]) -> IResult<&[u8], u32> {
        let (input, _) = opt(cfws)(input)?;
        alt((
            map(tag_no_case("Jan"), |_| 1),
            map(tag_no_case("Feb"), |_| 2),
            map(tag_no_case("Mar"), |_| 3),
            map(tag_no_case("Apr"), |_| 4),
            map(tag_no_case("May"), |_| 5),
            map(tag_no_case("Jun"), |_| 6),
            map(tag_no_case("Jul"), |_| 7),
            map(tag_no_case("Aug"), |_| 8),
            map(tag_no_case("Sep"), |_| 9),
            map(tag_no_case("Oct"), |_| 10),
            map(tag_no_case("Nov"), |_| 11),
            map(tag_no_case("Dec"), |_| 12),
        ))(input)
    }

    /// ```text
    /// year            =   (FWS 4*DIGIT FWS) / obs-year
    /// obs-year        =   [CFWS] 2*DIGIT [CFWS]
    /// ```
    ///
    /// Two digit years below 50 are in the 2000s, the rest and all three digit
    /// years are counted from 1900.
    fn year(input: &[u8]) -> IResult<&[u8], i32> {
        let (input, _) = opt(cfws)(input)?;
        let (input, ret) = take_while_m_n(2, 4, is_digit)(input)?;
        let value = digits_value(ret) as i32;
        let year = match ret.len() {
            2 if value < 50 => 2000 + value,
            2 | 3 => 1900 + value,
            _ => value,
        };
        Ok((input, year))
    }

    /// ```text
    /// date-time       =   [ day-of-week "," ] date time [CFWS]
    /// date            =   day month year
    /// time            =   time-of-day zone
    /// time-of-day     =   hour ":" minute [ ":" second ]
    /// ```
    ///
    /// A missing zone is read as `+0000`.
    pub fn date_time(input: &[u8]) -> IResult<&[u8], (UnixTimestamp, TzOffset)> {
        let orig_input = input;
        let (input, _) = opt(terminated(day_of_week, pair(opt(cfws), tag(","))))(input)?;
        let (input, day) = day(input)?;
        let (input, month) = month(input)?;
        let (input, year) = year(input)?;
        let (input, _) = opt(cfws)(input)?;
        let (input, hour) = take_while_m_n(1, 2, is_digit)(input)?;
        let (input, _) = tag(":")(input)?;
        let (input, minute) = take_n_digits(2)(input)?;
        let (input, second) = opt(preceded(tag(":"), take_n_digits(2)))(input)?;
        let (input, _) = opt(cfws)(input)?;
        let (input, tz_offset) = opt(zone)(input)?;
        let (input, _) = opt(cfws)(input)?;
        let tz_offset = tz_offset.unwrap_or(0);
        match timestamp_from_fields(
            (year, month, day),
            (
                digits_value(hour),
                digits_value(minute),
                second.map(digits_value).unwrap_or(0),
            ),
            tz_offset,
        ) {
            Some(t) => Ok((input, (t, tz_offset))),
            None => Err(nom::Err::Error(
                (orig_input, "date_time(): date fields out of range").into(),
            )),
        }
    }

    /// Parses a `Date` header value, also accepting dates hidden in encoded
    /// words.
    pub fn rfc5322_date(input: &[u8]) -> Result<(UnixTimestamp, TzOffset)> {
        match date_time(input) {
            Ok((_, ret)) => Ok(ret),
            Err(_) => {
                let decoded = super::encodings::phrase(input);
                date_time(decoded.as_bytes())
                    .map(|(_, ret)| ret)
                    .map_err(Error::from)
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use chrono::DateTime;

        use super::*;

        #[test]
        fn test_parser_date_obs_zone() {
            let (ts, tz) = rfc5322_date(b"Sat, 31 May 2008 08:56:43 EST").unwrap();
            assert_eq!(tz, -500);
            assert_eq!(
                ts,
                DateTime::parse_from_rfc2822("Sat, 31 May 2008 08:56:43 -0500")
                    .unwrap()
                    .timestamp()
            );
        }

        #[test]
        fn test_parser_date_variants() {
            let a = rfc5322_date(b"Thu, 31 Aug 2017 13:43:37 +0000 (UTC)").unwrap();
            let b = rfc5322_date(b"Thu, 31 Aug 2017 13:43:37 +0000").unwrap();
            let c = rfc5322_date(b"=?utf-8?q?Thu=2C_31_Aug_2017_13=3A43=3A37_-0000?=").unwrap();
            assert_eq!(a, b);
            assert_eq!(b, c);
            assert_eq!(
                rfc5322_date(b"31 Aug 17 13:43 +0130").unwrap(),
                (
                    DateTime::parse_from_rfc2822("Thu, 31 Aug 2017 13:43:00 +0130")
                        .unwrap()
                        .timestamp(),
                    130
                )
            );
            assert!(rfc5322_date(b"not a date").is_err());
            assert!(rfc5322_date(b"Thu, 31 Feb 2017 13:43:37 +0000").is_err());
        }
    }
}

pub mod generic {
    //! Generally useful parser combinators.
    use super::*;

    #[inline(always)]
    pub fn byte_in_range<'a>(a: u8, b: u8) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], u8> {
        move |input| {
            if input.is_empty() {
                return Err(nom::Err::Error((input, "empty input").into()));
            }
            if input[0] >= a && input[0] <= b {
                Ok((&input[1..], input[0]))
            } else {
                Err(nom::Err::Error((input, "out of range").into()))
            }
        }
    }

    ///`WSP            =  SP / HTAB ; white space`
    pub fn wsp(input: &[u8]) -> IResult<&[u8], u8> {
        if input.starts_with(b" ") || input.starts_with(b"\t") {
            Ok((&input[1..], input[0]))
        } else {
            Err(nom::Err::Error((input, "wsp(): not whitespace").into()))
        }
    }

    pub fn crlf(input: &[u8]) -> IResult<&[u8], ()> {
        if input.starts_with(b"\n") {
            Ok((&input[1..], ()))
        } else if input.starts_with(b"\r\n") {
            Ok((&input[2..], ()))
        } else {
            Err(nom::Err::Error((input, "crlf(): not a line break").into()))
        }
    }

    ///`FWS             =   ([*WSP CRLF] 1*WSP) /  obs-FWS`
    pub fn fws(input: &[u8]) -> IResult<&[u8], ()> {
        let mut rest = input;
        loop {
            if let Ok((r, _)) = wsp(rest) {
                rest = r;
                continue;
            }
            match crlf(rest) {
                Ok((r, ())) if wsp(r).is_ok() => rest = r,
                _ => break,
            }
        }
        if rest.len() == input.len() {
            Err(nom::Err::Error((input, "fws(): no WSP").into()))
        } else {
            Ok((rest, ()))
        }
    }

    ///```text
    /// ccontent        =   ctext / quoted-pair / comment
    /// comment         =   "(" *([FWS] ccontent) [FWS] ")"
    /// ```
    pub fn comment(input: &[u8]) -> IResult<&[u8], ()> {
        if !input.starts_with(b"(") {
            return Err(nom::Err::Error(
                (input, "comment(): not starting with '('").into(),
            ));
        }
        let mut depth = 1;
        let mut i = 1;
        while i < input.len() {
            match input[i] {
                b'\\' => i += 1,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((&input[i + 1..], ()));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(nom::Err::Error(
            (input, "comment(): unclosed comment").into(),
        ))
    }

    ///`CFWS            =   (1*([FWS] comment) [FWS]) / FWS`
    pub fn cfws(input: &[u8]) -> IResult<&[u8], ()> {
        map(many1(alt((fws, comment))), |_| ())(input)
    }

    ///`atext           =   ALPHA / DIGIT / "!" / "#" / "$" / "%" / "&" / "'" /
    /// "*" / "+" / "-" / "/" / "=" / "?" / "^" / "_" / "`" / "{" / "|" / "}" /
    /// "~"`
    ///
    /// RFC6532 adds `UTF8-non-ascii`.
    #[inline]
    pub fn is_atext(b: u8) -> bool {
        b.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~".contains(&b) || b >= 0x80
    }

    ///`atom            =   [CFWS] 1*atext [CFWS]`
    pub fn atom(input: &[u8]) -> IResult<&[u8], &[u8]> {
        delimited(opt(cfws), take_while1(is_atext), opt(cfws))(input)
    }

    ///`dot-atom-text   =   1*atext *("." 1*atext)`
    pub fn dot_atom_text(input: &[u8]) -> IResult<&[u8], &[u8]> {
        recognize(pair(
            take_while1(is_atext),
            many0(pair(tag("."), take_while1(is_atext))),
        ))(input)
    }

    ///`dot-atom        =   [CFWS] dot-atom-text [CFWS]`
    pub fn dot_atom(input: &[u8]) -> IResult<&[u8], &[u8]> {
        delimited(opt(cfws), dot_atom_text, opt(cfws))(input)
    }

    /// The `DQUOTE *([FWS] qcontent) [FWS] DQUOTE` part of a quoted string,
    /// returning the unescaped content.
    pub fn quoted_content(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
        let (mut input, _) = tag("\"")(input)?;
        let mut ret = Vec::new();
        loop {
            match input.first() {
                None => {
                    return Err(nom::Err::Error(
                        (input, "quoted_string(): unclosed DQUOTE").into(),
                    ))
                }
                Some(b'"') => {
                    input = &input[1..];
                    break;
                }
                Some(b'\\') if input.len() > 1 => {
                    ret.push(input[1]);
                    input = &input[2..];
                }
                Some(b'\r' | b'\n') => input = &input[1..],
                Some(&b) => {
                    ret.push(b);
                    input = &input[1..];
                }
            }
        }
        Ok((input, ret))
    }

    ///`quoted-string   =   [CFWS] DQUOTE *([FWS] qcontent) [FWS] DQUOTE
    /// [CFWS]`
    pub fn quoted_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
        delimited(opt(cfws), quoted_content, opt(cfws))(input)
    }

    ///`word            =   atom / quoted-string`
    pub fn word(input: &[u8]) -> IResult<&[u8], Cow<'_, [u8]>> {
        alt((
            map(quoted_string, Cow::Owned),
            map(atom, Cow::Borrowed),
        ))(input)
    }

    ///```text
    /// phrase          =   1*word / obs-phrase
    /// obs-phrase      =   word *(word / "." / CFWS)
    /// ```
    ///
    /// Words are joined with a single space.
    pub fn phrase(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
        let (mut input, first) = word(input)?;
        let mut ret = first.into_owned();
        let mut glue = false;
        loop {
            if let Ok((rest, w)) = word(input) {
                if !glue {
                    ret.push(b' ');
                }
                ret.extend_from_slice(&w);
                input = rest;
                glue = false;
            } else if let Ok((rest, (_, space))) = pair(tag("."), opt(cfws))(input) {
                ret.push(b'.');
                input = rest;
                glue = space.is_none();
            } else {
                break;
            }
        }
        Ok((input, ret))
    }

    ///```text
    /// dtext           =   %d33-90 /          ; Printable US-ASCII
    ///                    %d94-126 /         ;  characters not including
    ///                    obs-dtext          ;  "[", "]", or "\"
    /// ```
    pub fn dtext(input: &[u8]) -> IResult<&[u8], u8> {
        alt((byte_in_range(33, 90), byte_in_range(94, 126)))(input)
    }

}

pub mod headers {
    //! Email header fields.
    use super::*;

    /// Parses a single header field, returning its name and the raw bytes
    /// after the colon with folds kept and the final line break removed.
    ///
    /// A header can span multiple lines, eg:
    ///
    /// ```text
    /// Received: from -------------------- (-------------------------)
    /// 	by --------------------- (--------------------- [------------------])
    /// ```
    pub fn header(input: &[u8]) -> IResult<&[u8], (HeaderName, &[u8])> {
        let (rest, name) = context(
            "header()",
            take_while1(|b: u8| b != b':' && !is_ctl_or_space!(b)),
        )(input)?;
        let (rest, _) = context(
            "header()",
            preceded(take_while(|b: u8| b == b' ' || b == b'\t'), tag(":")),
        )(rest)?;
        let Ok(name) = HeaderName::try_from(name) else {
            return Err(nom::Err::Error(
                (input, "header(): invalid header name").into(),
            ));
        };
        let (rest, value) = header_value(rest)?;
        Ok((rest, (name, value)))
    }

    pub fn header_value(input: &[u8]) -> IResult<&[u8], &[u8]> {
        let mut i = 0;
        while i < input.len() {
            if input[i] == b'\n' {
                let next = input.get(i + 1).copied();
                if !matches!(next, Some(b' ' | b'\t')) {
                    let end = if i > 0 && input[i - 1] == b'\r' {
                        i - 1
                    } else {
                        i
                    };
                    return Ok((&input[i + 1..], &input[..end]));
                }
            }
            i += 1;
        }
        // Last field of a header block that is not terminated.
        Ok((&input[input.len()..], input))
    }

    pub fn headers(input: &[u8]) -> IResult<&[u8], Vec<(HeaderName, &[u8])>> {
        many1(header)(input)
    }

    /// Removes folding line breaks and surrounding whitespace from a raw
    /// header value.
    pub fn unfold(raw: &[u8]) -> String {
        let unfolded = raw
            .iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect::<Vec<u8>>();
        String::from_utf8_lossy(unfolded.trim()).into_owned()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parser_header_fields() {
            let (rest, (name, value)) =
                header(b"Received: from a\n\tby b; date\nSubject: x\n").unwrap();
            assert_eq!(name, HeaderName::RECEIVED);
            assert_eq!(value, b" from a\n\tby b; date");
            assert_eq!(rest, b"Subject: x\n");
            assert_eq!(unfold(value), "from a\tby b; date");

            let (rest, (name, value)) = header(b"X-Empty:\r\nTo: a@b").unwrap();
            assert_eq!(name.as_str(), "X-Empty");
            assert_eq!(value, b"");
            assert_eq!(rest, b"To: a@b");

            assert!(header(b"no colon here\n").is_err());
            assert!(header(b": empty name\n").is_err());
        }
    }
}

pub mod encodings {
    //! `RFC2047` encoded words in header values.
    use data_encoding::{BASE64_MIME, BASE64_NOPAD};

    use super::*;

    pub fn quoted_printable_byte(input: &[u8]) -> IResult<&[u8], u8> {
        fn hex(b: u8) -> Option<u8> {
            (b as char).to_digit(16).map(|d| d as u8)
        }
        if input.len() < 3 || input[0] != b'=' {
            return Err(nom::Err::Error(
                (input, "quoted_printable_byte(): invalid input").into(),
            ));
        }
        match (hex(input[1]), hex(input[2])) {
            (Some(a), Some(b)) => Ok((&input[3..], a * 16 + b)),
            _ => Err(nom::Err::Error(
                (input, "quoted_printable_byte(): invalid hex digits").into(),
            )),
        }
    }

    pub fn qp_underscore_header(input: &[u8]) -> IResult<&[u8], u8> {
        let (rest, _) = tag("_")(input)?;
        Ok((rest, 0x20))
    }

    // With MIME, headers in quoted printable format can contain underscores that
    // represent spaces. In non-header context, an underscore is just a plain
    // underscore.
    pub fn quoted_printable_bytes_header(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
        many0(alt((quoted_printable_byte, qp_underscore_header, le_u8)))(input)
    }

    /// Decodes `bytes` from the charset named by an `RFC2047`/`RFC2231` label.
    /// Unknown labels are read as UTF-8.
    pub fn decode_charset(bytes: &[u8], label: &[u8]) -> String {
        // RFC2231 language suffix: `charset*language`
        let label = label.split(|b| *b == b'*').next().unwrap_or_default();
        match encoding_rs::Encoding::for_label(label) {
            Some(encoding) => encoding
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    ///`encoded-word = "=?" charset "?" encoding "?" encoded-text "?="`
    pub fn encoded_word(input: &[u8]) -> IResult<&[u8], String> {
        let (rest, _) = tag("=?")(input)?;
        let (rest, charset) =
            take_while1(|b: u8| b != b'?' && !is_ctl_or_space!(b))(rest)?;
        let (rest, _) = tag("?")(rest)?;
        let (rest, encoding) = take(1_usize)(rest)?;
        let (rest, _) = tag("?")(rest)?;
        let (rest, encoded_text) = take_until("?=")(rest)?;
        let (rest, _) = tag("?=")(rest)?;
        if encoded_text.iter().any(|b| is_ctl_or_space!(*b)) {
            return Err(nom::Err::Error(
                (input, "encoded_word(): whitespace in encoded text").into(),
            ));
        }
        let bytes = match encoding[0] {
            b'b' | b'B' => BASE64_MIME.decode(encoded_text).or_else(|_| {
                let unpadded = encoded_text
                    .iter()
                    .copied()
                    .take_while(|b| *b != b'=')
                    .collect::<Vec<u8>>();
                BASE64_NOPAD.decode(&unpadded)
            }),
            b'q' | b'Q' => match quoted_printable_bytes_header(encoded_text) {
                Ok((b"", s)) => Ok(s),
                _ => {
                    return Err(nom::Err::Error(
                        (input, "encoded_word(): invalid quoted_printable").into(),
                    ))
                }
            },
            _ => {
                return Err(nom::Err::Error(
                    (input, "encoded_word(): expected 'b|q'").into(),
                ))
            }
        };
        let Ok(bytes) = bytes else {
            return Err(nom::Err::Error(
                (input, "encoded_word(): invalid base64").into(),
            ));
        };
        Ok((rest, decode_charset(&bytes, charset)))
    }

    /// Decodes a header text that may contain encoded words into display
    /// text. Line breaks are unfolded, and whitespace between two adjacent
    /// encoded words is dropped.
    pub fn phrase(input: &[u8]) -> String {
        let mut acc = String::with_capacity(input.len());
        let mut pending_space: Option<String> = None;
        let mut last_was_encoded = false;
        let mut input = input.trim();

        while !input.is_empty() {
            let ws_len = input
                .iter()
                .position(|b| !is_whitespace!(*b))
                .unwrap_or(input.len());
            if ws_len > 0 {
                let mut space = input[..ws_len]
                    .iter()
                    .filter(|b| **b != b'\r' && **b != b'\n')
                    .map(|b| *b as char)
                    .collect::<String>();
                if space.is_empty() {
                    space.push(' ');
                }
                pending_space = Some(space);
                input = &input[ws_len..];
                continue;
            }
            let word_len = input
                .iter()
                .position(|b| is_whitespace!(*b))
                .unwrap_or(input.len());
            let mut word = &input[..word_len];
            input = &input[word_len..];
            while !word.is_empty() {
                if let Ok((rest, decoded)) = encoded_word(word) {
                    if let Some(space) = pending_space.take() {
                        if !last_was_encoded {
                            acc.push_str(&space);
                        }
                    }
                    acc.push_str(&decoded);
                    last_was_encoded = true;
                    word = rest;
                } else {
                    let end = word[1..]
                        .find(b"=?")
                        .map(|idx| idx + 1)
                        .unwrap_or(word.len());
                    if let Some(space) = pending_space.take() {
                        acc.push_str(&space);
                    }
                    acc.push_str(&String::from_utf8_lossy(&word[..end]));
                    last_was_encoded = false;
                    word = &word[end..];
                }
            }
        }
        acc
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parser_encoded_words() {
            assert_eq!(
                phrase(b"=?UTF-8?Q?Eva_Lucy-Ann_Tester?="),
                "Eva Lucy-Ann Tester"
            );
            assert_eq!(
                phrase(b"=?iso-8859-1?q?this=20is=20some=20text?="),
                "this is some text"
            );
            assert_eq!(
                phrase(b"=?utf-8?b?zpXOu867zrfOvc65zrrOrA==?= text"),
                "Ελληνικά text"
            );
            assert_eq!(
                phrase(b"=?utf-8?q?a?=  \n =?utf-8?q?b?= c =?utf-8?q?d?="),
                "ab c d"
            );
            assert_eq!(phrase(b"plain   text\n\tfolded"), "plain   text\tfolded");
            assert_eq!(phrase(b"broken =?utf-8?q?word"), "broken =?utf-8?q?word");
            assert_eq!(phrase(b"=?utf-8?b?dGVzdA?="), "test");
            assert_eq!(phrase(b"=?ISO-8859-7*el?Q?=E1?="), "α");
        }
    }
}

pub mod address {
    //! Parsing of address values and address-related headers.
    //!
    //! Implemented RFCs:
    //!
    //! - [RFC5322 "Internet Message Format"](https://tools.ietf.org/html/rfc5322)
    //! - [RFC6532 "Internationalized Email Headers"](https://tools.ietf.org/html/rfc6532)
    //! - [RFC2047 "MIME Part Three: Message Header Extensions for Non-ASCII Text"](https://tools.ietf.org/html/rfc2047)
    use super::{generic::*, *};
    use crate::email::address::{Address, MailboxAddress};

    ///`local-part      =   dot-atom / quoted-string / obs-local-part`
    ///
    /// Quoted local parts keep their quotes.
    pub fn local_part(input: &[u8]) -> IResult<&[u8], &[u8]> {
        delimited(
            opt(cfws),
            alt((recognize(quoted_content), dot_atom_text)),
            opt(cfws),
        )(input)
    }

    ///`domain-literal  =   [CFWS] "[" *([FWS] dtext) [FWS] "]" [CFWS]`
    pub fn domain_literal(input: &[u8]) -> IResult<&[u8], &[u8]> {
        recognize(tuple((
            tag("["),
            many0(alt((map(fws, |_| ()), map(dtext, |_| ())))),
            tag("]"),
        )))(input)
    }

    ///`domain          =   dot-atom / domain-literal / obs-domain`
    pub fn domain(input: &[u8]) -> IResult<&[u8], &[u8]> {
        delimited(
            opt(cfws),
            alt((dot_atom_text, domain_literal)),
            opt(cfws),
        )(input)
    }

    ///`addr-spec       =   local-part "@" domain`
    pub fn addr_spec(input: &[u8]) -> IResult<&[u8], String> {
        let (input, local_part) = context("addr_spec()", local_part)(input)?;
        let (input, _) = context("addr_spec()", tag("@"))(input)?;
        let (input, domain) = context("addr_spec()", domain)(input)?;
        Ok((
            input,
            format!(
                "{}@{}",
                String::from_utf8_lossy(local_part),
                String::from_utf8_lossy(domain)
            ),
        ))
    }

    ///`angle-addr      =   [CFWS] "<" addr-spec ">" [CFWS] / obs-angle-addr`
    ///
    /// Whatever is found between the angle brackets is accepted when it is not
    /// a valid `addr-spec`.
    pub fn angle_addr(input: &[u8]) -> IResult<&[u8], String> {
        let (input, _) = opt(cfws)(input)?;
        let (input, inner) = delimited(tag("<"), opt(is_not("<>")), tag(">"))(input)?;
        let (input, _) = opt(cfws)(input)?;
        let inner = inner.unwrap_or_default();
        let spec = match addr_spec(inner) {
            Ok((rest, spec)) if rest.trim().is_empty() => spec,
            _ => String::from_utf8_lossy(inner.trim()).into_owned(),
        };
        Ok((input, spec))
    }

    ///`display-name    =   phrase`
    pub fn display_name(input: &[u8]) -> IResult<&[u8], String> {
        let (rest, raw) = phrase(input)?;
        Ok((rest, super::encodings::phrase(&raw)))
    }

    ///`name-addr       =   [display-name] angle-addr`
    pub fn name_addr(input: &[u8]) -> IResult<&[u8], MailboxAddress> {
        let (input, (display_name, address_spec)) = alt((
            pair(map(display_name, Some), angle_addr),
            map(angle_addr, |r| (None, r)),
        ))(input)?;
        Ok((input, MailboxAddress::new(display_name, address_spec)))
    }

    ///`mailbox         =   name-addr / addr-spec`
    pub fn mailbox(input: &[u8]) -> IResult<&[u8], MailboxAddress> {
        alt((
            name_addr,
            map(addr_spec, |address_spec| MailboxAddress {
                display_name: None,
                address_spec,
            }),
        ))(input)
    }

    fn comma(input: &[u8]) -> IResult<&[u8], ()> {
        map(delimited(opt(cfws), tag(","), opt(cfws)), |_| ())(input)
    }

    ///```text
    /// group           =   display-name ":" [group-list] ";" [CFWS]
    /// group-list      =   mailbox-list / CFWS / obs-group-list
    /// ```
    pub fn group(input: &[u8]) -> IResult<&[u8], Address> {
        let (input, display_name) = context("group()", display_name)(input)?;
        let (input, _) = context("group()", tag(":"))(input)?;
        let (input, _) = many0(comma)(input)?;
        let (input, mailbox_list) = context("group()", separated_list0(many1(comma), mailbox))(input)?;
        let (input, _) = many0(comma)(input)?;
        let (input, _) = opt(cfws)(input)?;
        let (input, _) = context("group()", tag(";"))(input)?;
        let (input, _) = opt(cfws)(input)?;
        Ok((input, Address::new_group(display_name, mailbox_list)))
    }

    /// `address         =   mailbox / group`
    pub fn address(input: &[u8]) -> IResult<&[u8], Address> {
        alt((map(mailbox, Address::Mailbox), group))(input)
    }

    /// Skips the remains of an unparseable list element, up to and including
    /// the next top-level comma.
    fn skip_element(input: &[u8]) -> &[u8] {
        let mut i = 0;
        while i < input.len() {
            match input[i] {
                b',' => return &input[i + 1..],
                b'"' => {
                    i = match quoted_content(&input[i..]) {
                        Ok((rest, _)) => input.len() - rest.len(),
                        Err(_) => input.len(),
                    };
                    continue;
                }
                b'(' => {
                    i = match comment(&input[i..]) {
                        Ok((rest, ())) => input.len() - rest.len(),
                        Err(_) => input.len(),
                    };
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        &input[input.len()..]
    }

    /// Lenient `address-list` parsing.
    ///
    /// Elements that are not valid addresses are skipped; a lone local part
    /// such as `postmaster` is accepted as an address without domain.
    pub fn address_list(mut input: &[u8]) -> Vec<Address> {
        let mut ret = vec![];
        loop {
            input = input.ltrim();
            while let Ok((rest, ())) = comma(input) {
                input = rest;
            }
            if let Ok((rest, ())) = cfws(input) {
                input = rest;
            }
            if input.is_empty() {
                break;
            }
            let element = alt((
                address,
                map(dot_atom, |local| Address::new(None, String::from_utf8_lossy(local).into_owned())),
            ))(input);
            match element {
                Ok((rest, addr)) if rest.is_empty() || comma(rest).is_ok() => {
                    ret.push(addr);
                    input = rest;
                }
                _ => {
                    log::trace!(
                        "skipping unparseable address list element in {:?}",
                        String::from_utf8_lossy(input)
                    );
                    input = skip_element(input);
                }
            }
        }
        ret
    }

    ///`no-fold-literal =   "[" *dtext "]"`
    pub fn no_fold_literal(input: &[u8]) -> IResult<&[u8], &[u8]> {
        recognize(tuple((tag("["), many0(dtext), tag("]"))))(input)
    }

    ///```text
    /// msg-id          =   [CFWS] "<" id-left "@" id-right ">" [CFWS]
    /// id-left         =   dot-atom-text / obs-id-left
    /// id-right        =   dot-atom-text / no-fold-literal / obs-id-right
    /// ```
    ///
    /// Returns the token without angle brackets.
    pub fn msg_id(input: &[u8]) -> IResult<&[u8], String> {
        let (input, _) = opt(cfws)(input)?;
        let (input, _) = tag("<")(input)?;
        let (input, spec) = recognize(tuple((
            dot_atom_text,
            tag("@"),
            alt((dot_atom_text, no_fold_literal)),
        )))(input)?;
        let (input, _) = tag(">")(input)?;
        let (input, _) = opt(cfws)(input)?;
        Ok((input, String::from_utf8_lossy(spec).into_owned()))
    }

    /// Accepts anything between angle brackets, or a single bare token.
    pub fn msg_id_lenient(input: &[u8]) -> IResult<&[u8], String> {
        let (input, _) = opt(cfws)(input)?;
        let (input, token) = alt((
            delimited(tag("<"), take_while(|b: u8| b != b'>'), tag(">")),
            take_while1(|b: u8| !is_whitespace!(b) && b != b'<' && b != b'('),
        ))(input)?;
        let token = token
            .iter()
            .copied()
            .filter(|b| !is_whitespace!(*b))
            .collect::<Vec<u8>>();
        if token.is_empty() {
            return Err(nom::Err::Error(
                (input, "msg_id_lenient(): empty message id").into(),
            ));
        }
        Ok((input, String::from_utf8_lossy(&token).into_owned()))
    }

    /// Decodes a `Message-ID` style value into its bare token, trying the
    /// strict grammar first.
    pub fn message_id(input: &[u8]) -> Option<String> {
        msg_id(input)
            .or_else(|_| msg_id_lenient(input))
            .ok()
            .map(|(_, id)| id)
    }

    /// Decodes `References` and `In-Reply-To` values into the ordered list of
    /// bare message id tokens. Words outside of angle brackets are ignored.
    pub fn references(mut input: &[u8]) -> Vec<String> {
        let mut ret = vec![];
        loop {
            input = input.ltrim();
            if let Ok((rest, ())) = cfws(input) {
                input = rest;
            }
            if input.is_empty() {
                break;
            }
            if input.starts_with(b"<") {
                match msg_id(input).or_else(|_| msg_id_lenient(input)) {
                    Ok((rest, id)) => {
                        ret.push(id);
                        input = rest;
                    }
                    // Unclosed bracket.
                    Err(_) => input = &input[1..],
                }
            } else if let Ok((rest, _)) = word(input) {
                input = rest;
            } else {
                input = &input[1..];
            }
        }
        ret
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parser_address_list() {
            let list = address_list(
                b"Tester <tester@localhost.com>, \"Doe, John\" <john@example.com> (work),\n\t\
                  alice@example.com, Group: a@b.c, Bob <bob@x.y>;, undisclosed-recipients:;",
            );
            assert_eq!(list.len(), 5);
            assert_eq!(list[0], Address::new(Some("Tester".into()), "tester@localhost.com".into()));
            assert_eq!(list[1], Address::new(Some("Doe, John".into()), "john@example.com".into()));
            assert_eq!(list[2], Address::new(None, "alice@example.com".into()));
            let Address::Group(group) = &list[3] else {
                panic!("expected group: {:?}", list[3]);
            };
            assert_eq!(group.display_name, "Group");
            assert_eq!(group.mailbox_list.len(), 2);
            assert_eq!(group.mailbox_list[1].address_spec, "bob@x.y");
            let Address::Group(group) = &list[4] else {
                panic!("expected group: {:?}", list[4]);
            };
            assert!(group.mailbox_list.is_empty());
        }

        #[test]
        fn test_parser_address_list_lenient() {
            let list = address_list(b"<<<broken, postmaster, \"unterminated <x@y>");
            assert_eq!(list, vec![Address::new(None, "postmaster".into())]);
            assert!(address_list(b"").is_empty());
            assert!(address_list(b" , ,").is_empty());

            let list = address_list(b"=?utf-8?q?Ren=C3=A9_?= =?utf-8?q?Descartes?= <rene@x.fr>");
            assert_eq!(
                list,
                vec![Address::new(Some("René Descartes".into()), "rene@x.fr".into())]
            );
            let list = address_list(b"root@[192.0.2.1], <weird address>");
            assert_eq!(
                list,
                vec![
                    Address::new(None, "root@[192.0.2.1]".into()),
                    Address::new(None, "weird address".into())
                ]
            );
        }

        #[test]
        fn test_parser_msg_id() {
            assert_eq!(
                message_id(b"<136734928.123728@localhost.com>").as_deref(),
                Some("136734928.123728@localhost.com")
            );
            assert_eq!(
                message_id(b"  (comment) <a@[127.0.0.1]>").as_deref(),
                Some("a@[127.0.0.1]")
            );
            assert_eq!(message_id(b"<no domain>").as_deref(), Some("nodomain"));
            assert_eq!(message_id(b"bare@token extra").as_deref(), Some("bare@token"));
            assert_eq!(message_id(b"<>"), None);
            assert_eq!(message_id(b"   "), None);
        }

        #[test]
        fn test_parser_references() {
            assert_eq!(
                references(b"<a@b> <c@d>\n\t<e@f> (comment) \"quoted <x@y>\" <g@h"),
                vec!["a@b", "c@d", "e@f"]
            );
            assert_eq!(
                references(b"Your message of today <1234@local.machine.example>"),
                vec!["1234@local.machine.example"]
            );
            assert!(references(b"").is_empty());
        }
    }
}

pub mod mime {
    //! `Content-Type` values.
    use super::*;

    /// `;` `attribute` `=` `value`, where value is a token or a quoted
    /// string. Values are not unescaped.
    pub fn content_type_parameter(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
        let (input, _) = tag(";")(input.ltrim())?;
        let (input, name) = terminated(take_until("="), tag("="))(input.ltrim())?;
        let (input, value) = alt((
            delimited(tag("\""), take_until("\""), tag("\"")),
            is_not(";"),
        ))(input.ltrim())?;

        Ok((input, (name.trim(), value.trim())))
    }

    ///`content := "Content-Type" ":" type "/" subtype *(";" parameter)`
    pub fn content_type(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8], Vec<(&[u8], &[u8])>)> {
        let (input, _type) = take_until("/")(input.ltrim())?;
        let (input, _) = tag("/")(input)?;
        let (input, _subtype) = is_not(";")(input)?;
        let (input, parameters) = many0(content_type_parameter)(input)?;
        let (_type, _subtype) = (_type.trim(), _subtype.trim());
        if _type.is_empty()
            || _subtype.is_empty()
            || _type.iter().chain(_subtype.iter()).any(|b| is_ctl_or_space!(*b))
        {
            return Err(nom::Err::Error(
                (input, "content_type(): invalid type/subtype").into(),
            ));
        }
        Ok((input, (_type, _subtype, parameters)))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parser_content_type() {
            let (_, (t, s, params)) =
                content_type(b"multipart/signed; micalg=pgp-sha256;\n\tboundary=\"=-abc; d\"")
                    .unwrap();
            assert_eq!(t, b"multipart");
            assert_eq!(s, b"signed");
            assert_eq!(
                params,
                vec![(&b"micalg"[..], &b"pgp-sha256"[..]), (&b"boundary"[..], &b"=-abc; d"[..])]
            );
            assert!(content_type(b"text").is_err());
            assert!(content_type(b"/plain").is_err());
        }
    }
}
