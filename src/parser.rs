use crate::error::OverlayError;
use crate::srt::Subtitle;

use std::time::Duration;

use nom::bytes::complete::{tag, take_while1, take_while_m_n};
use nom::character::complete::{
    digit1, line_ending, multispace0, multispace1, not_line_ending, space0, space1,
};
use nom::combinator::{map_res, opt};
use nom::error::{convert_error, ContextError, ErrorKind, ParseError, VerboseError};
use nom::sequence::{preceded, terminated, tuple};
use nom::{branch::alt, error_position, Err, IResult};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parse the contents of an SRT file. Entries are returned in file order.
pub fn parse(input: &str) -> Result<Vec<Subtitle>, OverlayError> {
    match srt_file(input) {
        Ok((_, subs)) => {
            log::debug!("Parsed {} subtitle entries", subs.len());
            Ok(subs)
        }
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            let conv = convert_error(input, err);
            Err(OverlayError::Parse(format!(
                "Failed to parse SRT data:\n{}",
                conv
            )))
        }
        Err(Err::Incomplete(_)) => Err(OverlayError::Parse(
            "Incomplete data received by non-streaming parser.".to_string(),
        )),
    }
}

fn literal<'a>(t: &'static str) -> impl Fn(&'a str) -> Res<'a, &'a str> {
    tag(t)
}

fn optional_bom(input: &str) -> Res<Option<&str>> {
    opt(literal("\u{FEFF}"))(input)
}

fn srt_file(input: &str) -> Res<Vec<Subtitle>> {
    let (input, _) = optional_bom(input)?;
    let (input, subs) = all_subtitles(input)?;
    let (input, _) = end_of_file(input)?;
    Ok((input, subs))
}

fn all_subtitles(input: &str) -> Res<Vec<Subtitle>> {
    let mut parsed_subs = Vec::new();
    let (mut input, _) = multispace0::<_, VerboseError<&str>>(input)?;
    loop {
        match subtitle(input) {
            Ok((rem_input, subtitle)) => {
                parsed_subs.push(subtitle);
                let (rem_input, _) = multispace0::<_, VerboseError<&str>>(rem_input)?;
                input = rem_input;
            }
            Err(err) => {
                if input.is_empty() {
                    return Ok((input, parsed_subs));
                } else {
                    return Err(err);
                }
            }
        }
    }
}

fn subtitle(input: &str) -> Res<Subtitle> {
    let (input, _) = terminated(seq_num, multispace1)(input)?;
    let (input, (show_at, hide_at)) = terminated(show_hide, line_ending)(input)?;
    let (input, text) = sub_text(input)?;

    Ok((input, Subtitle::new(show_at, hide_at, text)))
}

fn end_of_file(input: &str) -> Res<&str> {
    if input.is_empty() {
        Ok((input, input))
    } else {
        Err(Err::Error(error_position!(input, ErrorKind::Eof)))
    }
}

/// A line holding nothing but spaces or tabs ends a caption.
fn blank_line(input: &str) -> Res<&str> {
    terminated(space0, alt((line_ending, end_of_file)))(input)
}

/// The index and timing lines that open an entry.
fn entry_header(input: &str) -> Res<(Duration, Duration)> {
    let (input, (_, _, _, times)) = tuple((seq_num, space0, line_ending, show_hide))(input)?;
    Ok((input, times))
}

fn sub_text(input: &str) -> Res<Vec<String>> {
    let mut lines = Vec::new();
    let mut input = input;
    loop {
        if let Ok((rem_input, _)) = blank_line(input) {
            return Ok((rem_input, lines));
        }
        if entry_header(input).is_ok() {
            let err = VerboseError::from_error_kind(input, ErrorKind::Verify);
            return Err(Err::Failure(VerboseError::add_context(
                input,
                "blank line before the next subtitle",
                err,
            )));
        }
        let (rem_input, line) = terminated(
            take_while1(|c: char| c != '\n' && c != '\r'),
            alt((line_ending, end_of_file)),
        )(input)?;
        lines.push(line.to_string());
        input = rem_input;
    }
}

fn show_hide(input: &str) -> Res<(Duration, Duration)> {
    let (input, show_at) = timestamp(input)?;
    let (input, _) = space0::<_, VerboseError<&str>>(input)?;
    let (input, _) = literal("-->")(input)?;
    let (input, _) = space0::<_, VerboseError<&str>>(input)?;
    let (input, hide_at) = timestamp(input)?;
    // Anything after the end time, such as `X1:100 X2:600` positioning, is ignored.
    let (input, _) = opt(preceded(space1::<_, VerboseError<&str>>, not_line_ending))(input)?;

    Ok((input, (show_at, hide_at)))
}

fn millis_field(input: &str) -> Res<u64> {
    const MILLIS_MAX: usize = 3;
    map_res(
        take_while_m_n(0, MILLIS_MAX, |c: char| c.is_ascii_digit()),
        |s: &str| {
            // `,2` means 200ms, so short values are right-padded.
            format!("{:0<3}", s).parse::<u64>()
        },
    )(input)
}

fn hms_field(input: &str) -> Res<u64> {
    const HMS_MAX: usize = 2;
    map_res(
        take_while_m_n(0, HMS_MAX, |c: char| c.is_ascii_digit()),
        |s: &str| {
            // 1:13:45 is 01:13:45, so short values are left-padded.
            format!("{:0>2}", s).parse::<u64>()
        },
    )(input)
}

fn timestamp(input: &str) -> Res<Duration> {
    let (input, hours) = hms_field(input)?;
    let (input, _) = literal(":")(input)?;
    let (input, minutes) = hms_field(input)?;
    let (input, _) = literal(":")(input)?;
    let (input, seconds) = hms_field(input)?;
    let (input, _) = alt((literal(","), literal(".")))(input)?;
    let (input, millis) = millis_field(input)?;

    Ok((
        input,
        Duration::from_millis(
            millis + seconds * 1000 + minutes * 60 * 1000 + hours * 60 * 60 * 1000,
        ),
    ))
}

fn seq_num(input: &str) -> Res<usize> {
    map_res(digit1, |s: &str| s.parse())(input)
}
