use chrono::NaiveDate;

use crate::{CoreError, CoreResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CoreError::bad_request("Invalid date format. Use YYYY-MM-DD"))
}

/// Parses both ends of a stay and checks `check_in < check_out`.
pub fn parse_stay(check_in: &str, check_out: &str) -> CoreResult<(NaiveDate, NaiveDate)> {
    let check_in = parse_date(check_in)?;
    let check_out = parse_date(check_out)?;
    if check_in >= check_out {
        return Err(CoreError::bad_request(
            "check_out_date must be after check_in_date",
        ));
    }
    Ok((check_in, check_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stay() {
        let (a, b) = parse_stay("2030-05-01", "2030-05-03").unwrap();
        assert_eq!(a, NaiveDate::from_ymd_opt(2030, 5, 1).unwrap());
        assert_eq!(b, NaiveDate::from_ymd_opt(2030, 5, 3).unwrap());

        assert!(matches!(parse_stay("2030-05-03", "2030-05-03"), Err(CoreError::BadRequest(_))));
        assert!(matches!(parse_stay("03/05/2030", "2030-05-04"), Err(CoreError::BadRequest(_))));
    }
}
