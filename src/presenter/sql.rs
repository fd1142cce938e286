use crate::core::DayRange;

/// Account-usage view holding daily storage per database
pub const USAGE_VIEW: &str = "snowflake.account_usage.database_storage_usage_history";

/// Storage usage per day and database over the last `range` days, in GB.
///
/// The day count is substituted as a literal; it can only come from the
/// `DayRange` enum, so no binding is needed.
pub fn usage_sql(range: DayRange) -> String {
    format!(
        "select CAST(usage_date AS DATE) AS usage_date, database_name,
       max(AVERAGE_DATABASE_BYTES+AVERAGE_FAILSAFE_BYTES)/POWER(1024,3) AS TOTAL_BYTES
from   {view}
where  usage_date >= dateadd(day, -{days}, current_date())
and    usage_date < current_date()
group  by 1,2
order  by 1,2",
        view = USAGE_VIEW,
        days = range.days(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dateadd_literal_matches_range() {
        for range in DayRange::ALL {
            let sql = usage_sql(range);
            let expected = format!("dateadd(day, -{}, current_date())", range.days());
            assert!(sql.contains(&expected), "{sql}");
            assert!(sql.contains("usage_date < current_date()"));
        }
    }

    #[test]
    fn test_sql_is_stable_across_calls() {
        for range in DayRange::ALL {
            assert_eq!(usage_sql(range), usage_sql(range));
        }
        assert_ne!(usage_sql(DayRange::Week), usage_sql(DayRange::TwoWeeks));
    }

    #[test]
    fn test_sql_shape() {
        let sql = usage_sql(DayRange::Quarter);
        assert!(sql.starts_with("select CAST(usage_date AS DATE) AS usage_date"));
        assert!(sql.contains("/POWER(1024,3) AS TOTAL_BYTES"));
        assert!(sql.contains(USAGE_VIEW));
        assert!(sql.ends_with("order  by 1,2"));
    }
}
