//! Remote alarm schedule: payload parsing and periodic refresh.
//!
//! The schedule endpoint answers with a small JSON object such as
//! `{"hour": 6, "minute": 45}`. [`parse_schedule`] accepts members in any
//! order and ignores unknown scalar members, but requires both `hour` and
//! `minute` and range-checks them. [`PeriodicSchedule`] drives a
//! [`ScheduleFetcher`] immediately on the first poll and then once per refresh
//! period, turning each fetch into one update for the controller.

use core::{fmt, time::Duration};

use winnow::Parser;
use winnow::ascii::{dec_int, multispace0};
use winnow::combinator::{alt, delimited, opt, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::token::take_while;

use crate::time::{Instant, WallTime};

/// Default interval between schedule fetches.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Reasons a schedule update could not be applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleError {
    /// The transport could not deliver a payload.
    Unavailable,
    /// The payload is not a flat JSON object.
    Malformed,
    /// A required member is absent.
    MissingField(&'static str),
    /// A member is outside its civil range.
    OutOfRange { field: &'static str, value: i64 },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Unavailable => f.write_str("schedule source unavailable"),
            ScheduleError::Malformed => f.write_str("malformed schedule payload"),
            ScheduleError::MissingField(field) => write!(f, "missing `{field}`"),
            ScheduleError::OutOfRange { field, value } => {
                write!(f, "`{field}` value {value} out of range")
            }
        }
    }
}

/// Parses a `{"hour": H, "minute": M}` payload into a [`WallTime`].
///
/// # Errors
///
/// Returns [`ScheduleError::Malformed`] for text that is not a flat JSON
/// object, [`ScheduleError::MissingField`] when either member is absent, and
/// [`ScheduleError::OutOfRange`] for hours outside 0-23 or minutes outside 0-59.
pub fn parse_schedule(payload: &str) -> Result<WallTime, ScheduleError> {
    let mut input = payload;
    let fields = delimited(whitespace, object, whitespace)
        .parse_next(&mut input)
        .map_err(|_| ScheduleError::Malformed)?;
    if !input.is_empty() {
        return Err(ScheduleError::Malformed);
    }

    let hour = required(fields.hour, "hour", 23)?;
    let minute = required(fields.minute, "minute", 59)?;
    WallTime::new(hour, minute).map_err(|_| ScheduleError::Malformed)
}

fn required(value: Option<i64>, field: &'static str, max: u8) -> Result<u8, ScheduleError> {
    let value = value.ok_or(ScheduleError::MissingField(field))?;
    u8::try_from(value)
        .ok()
        .filter(|candidate| *candidate <= max)
        .ok_or(ScheduleError::OutOfRange { field, value })
}

#[derive(Default)]
struct ScheduleFields {
    hour: Option<i64>,
    minute: Option<i64>,
}

fn whitespace(input: &mut &str) -> PResult<()> {
    multispace0.void().parse_next(input)
}

fn symbol(expected: char) -> impl FnMut(&mut &str) -> PResult<char> {
    move |input: &mut &str| {
        let mut parser = expected;
        parser.parse_next(input)
    }
}

fn object(input: &mut &str) -> PResult<ScheduleFields> {
    let mut fields = ScheduleFields::default();
    symbol('{').parse_next(input)?;
    whitespace(input)?;
    if opt(symbol('}')).parse_next(input)?.is_some() {
        return Ok(fields);
    }

    loop {
        let (name, value) =
            separated_pair(string, (whitespace, symbol(':'), whitespace), scalar).parse_next(input)?;
        match name {
            "hour" => fields.hour = value,
            "minute" => fields.minute = value,
            _ => {}
        }

        whitespace(input)?;
        if opt(symbol(',')).parse_next(input)?.is_some() {
            whitespace(input)?;
            continue;
        }
        symbol('}').parse_next(input)?;
        return Ok(fields);
    }
}

fn string<'a>(input: &mut &'a str) -> PResult<&'a str> {
    delimited(
        symbol('"'),
        take_while(0.., |c: char| c != '"' && c != '\\'),
        symbol('"'),
    )
    .parse_next(input)
}

/// Integer members yield their value; strings and literals are accepted and ignored.
fn scalar(input: &mut &str) -> PResult<Option<i64>> {
    alt((
        dec_int::<_, i64, _>.map(Some),
        string.map(|_| None),
        alt(("true", "false", "null")).map(|_| None),
    ))
    .parse_next(input)
}

/// Supplier of schedule updates polled by the controller.
pub trait ScheduleSource {
    /// Returns a new target, a fetch failure, or `None` when nothing is due.
    fn poll_update(&mut self, now: Instant) -> Option<Result<WallTime, ScheduleError>>;
}

/// Schedule source that never produces updates.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopScheduleSource;

impl ScheduleSource for NoopScheduleSource {
    fn poll_update(&mut self, _: Instant) -> Option<Result<WallTime, ScheduleError>> {
        None
    }
}

impl<T> ScheduleSource for Option<T>
where
    T: ScheduleSource,
{
    fn poll_update(&mut self, now: Instant) -> Option<Result<WallTime, ScheduleError>> {
        self.as_mut().and_then(|source| source.poll_update(now))
    }
}

/// Performs one blocking fetch of the remote schedule.
pub trait ScheduleFetcher {
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when the transport fails or the payload is rejected.
    fn fetch(&mut self) -> Result<WallTime, ScheduleError>;
}

impl<F> ScheduleFetcher for F
where
    F: FnMut() -> Result<WallTime, ScheduleError>,
{
    fn fetch(&mut self) -> Result<WallTime, ScheduleError> {
        self()
    }
}

/// Fetches on the first poll and then once per refresh period.
pub struct PeriodicSchedule<F> {
    fetcher: F,
    period: Duration,
    next_fetch_at: Option<Instant>,
}

impl<F> PeriodicSchedule<F>
where
    F: ScheduleFetcher,
{
    pub const fn new(fetcher: F) -> Self {
        Self::with_period(fetcher, DEFAULT_REFRESH_PERIOD)
    }

    pub const fn with_period(fetcher: F, period: Duration) -> Self {
        Self {
            fetcher,
            period,
            next_fetch_at: None,
        }
    }

    pub const fn period(&self) -> Duration {
        self.period
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }
}

impl<F> ScheduleSource for PeriodicSchedule<F>
where
    F: ScheduleFetcher,
{
    fn poll_update(&mut self, now: Instant) -> Option<Result<WallTime, ScheduleError>> {
        if self.next_fetch_at.is_some_and(|due| now < due) {
            return None;
        }
        self.next_fetch_at = Some(now + self.period);
        Some(self.fetcher.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u8, minute: u8) -> WallTime {
        WallTime::new(hour, minute).expect("valid time")
    }

    #[test]
    fn parses_payload_in_any_member_order() {
        assert_eq!(parse_schedule(r#"{"hour":6,"minute":45}"#), Ok(hm(6, 45)));
        assert_eq!(
            parse_schedule(" {\n  \"minute\" : 0 ,\n  \"hour\" : 23\n}\r\n"),
            Ok(hm(23, 0))
        );
    }

    #[test]
    fn ignores_unknown_scalar_members() {
        let payload = r#"{"id":17,"label":"weekday","enabled":true,"hour":7,"minute":5,"note":null}"#;
        assert_eq!(parse_schedule(payload), Ok(hm(7, 5)));
    }

    #[test]
    fn rejects_missing_members() {
        assert_eq!(
            parse_schedule(r#"{"hour":7}"#),
            Err(ScheduleError::MissingField("minute"))
        );
        assert_eq!(parse_schedule("{}"), Err(ScheduleError::MissingField("hour")));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            parse_schedule(r#"{"hour":24,"minute":0}"#),
            Err(ScheduleError::OutOfRange {
                field: "hour",
                value: 24
            })
        );
        assert_eq!(
            parse_schedule(r#"{"hour":5,"minute":-1}"#),
            Err(ScheduleError::OutOfRange {
                field: "minute",
                value: -1
            })
        );
    }

    #[test]
    fn rejects_malformed_text() {
        for payload in [
            "",
            "hour=6",
            r#"{"hour":6,"minute":45"#,
            r#"{"hour":6,"minute":45} trailing"#,
            r#"{"hour":6.5,"minute":45}"#,
            r#"{"hour":{"nested":1},"minute":45}"#,
        ] {
            assert_eq!(parse_schedule(payload), Err(ScheduleError::Malformed), "{payload}");
        }
    }

    #[test]
    fn periodic_schedule_fetches_immediately_then_per_period() {
        let mut calls = 0;
        let mut source = PeriodicSchedule::with_period(
            || {
                calls += 1;
                Ok::<_, ScheduleError>(WallTime::MIDNIGHT)
            },
            Duration::from_secs(60),
        );

        assert!(source.poll_update(Instant::from_millis(5_000)).is_some());
        assert!(source.poll_update(Instant::from_millis(6_000)).is_none());
        assert!(source.poll_update(Instant::from_millis(64_999)).is_none());
        assert!(source.poll_update(Instant::from_millis(65_000)).is_some());
        drop(source);
        assert_eq!(calls, 2);
    }

    #[test]
    fn periodic_schedule_surfaces_fetch_errors() {
        let mut source = PeriodicSchedule::new(|| Err::<WallTime, _>(ScheduleError::Unavailable));
        assert_eq!(
            source.poll_update(Instant::ZERO),
            Some(Err(ScheduleError::Unavailable))
        );
    }

    #[test]
    fn absent_source_never_updates() {
        let mut source: Option<NoopScheduleSource> = None;
        assert_eq!(source.poll_update(Instant::ZERO), None);

        let fetch = || Ok::<_, ScheduleError>(WallTime::MIDNIGHT);
        let mut present = Some(PeriodicSchedule::new(fetch));
        assert_eq!(present.poll_update(Instant::ZERO), Some(Ok(WallTime::MIDNIGHT)));
    }
}
