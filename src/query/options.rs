//! Clause option values
//!
//! The fixed words accepted after VIEW, CHART, PERIOD, SIZE and the
//! extension clauses, plus aggregation functions and sort directions.

use chrono::{Datelike, Months, NaiveDate};

named_enum! {
    /// Report layout selected by `VIEW`
    #[derive(Default)]
    pub enum ViewMode {
        #[default]
        Summary => "summary",
        Chart => "chart",
        Table => "table",
        Full => "full",
        Retainer => "retainer",
    }
}

impl ViewMode {
    /// Whether a CHART clause can be rendered in this view
    pub fn supports_chart(&self) -> bool {
        matches!(self, Self::Chart | Self::Full)
    }
}

named_enum! {
    /// Chart selected by `CHART`
    pub enum ChartType {
        Trend => "trend",
        Monthly => "monthly",
        Budget => "budget",
        Utilization => "utilization",
        Burndown => "burndown",
    }
}

named_enum! {
    /// Reporting window selected by `PERIOD`
    #[derive(Default)]
    pub enum Period {
        #[default]
        CurrentYear => "current-year",
        AllTime => "all-time",
        Last6Months => "last-6-months",
        Last12Months => "last-12-months",
        Last3Months => "last-3-months",
        CurrentMonth => "current-month",
    }
}

impl Period {
    /// Resolve to an inclusive date range relative to `today`
    ///
    /// Returns `None` for [`Period::AllTime`], which has no bounds. Rolling
    /// windows end on `today` and start the given number of calendar months
    /// earlier.
    pub fn date_range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let months_back = |n: u32| today.checked_sub_months(Months::new(n)).map(|start| (start, today));

        match self {
            Self::AllTime => None,
            Self::CurrentYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
                let end = NaiveDate::from_ymd_opt(today.year(), 12, 31)?;
                Some((start, end))
            }
            Self::CurrentMonth => {
                let start = today.with_day(1)?;
                let end = start
                    .checked_add_months(Months::new(1))?
                    .pred_opt()?;
                Some((start, end))
            }
            Self::Last3Months => months_back(3),
            Self::Last6Months => months_back(6),
            Self::Last12Months => months_back(12),
        }
    }
}

named_enum! {
    /// Output density selected by `SIZE`
    #[derive(Default)]
    pub enum SizeMode {
        Compact => "compact",
        #[default]
        Normal => "normal",
        Detailed => "detailed",
    }
}

named_enum! {
    /// Aggregation functions usable in SHOW and HAVING
    pub enum AggregationFunc {
        Sum => "sum",
        Avg => "avg",
        Min => "min",
        Max => "max",
        Count => "count",
    }
}

named_enum! {
    /// Sort direction for ORDER BY
    #[derive(Default)]
    pub enum SortDirection {
        #[default]
        Asc => "asc",
        Desc => "desc",
    }
}

named_enum! {
    /// Analysis requested by `RETAINER`
    pub enum RetainerAnalysis {
        Health => "health",
        Status => "status",
        Forecast => "forecast",
        Usage => "usage",
    }
}

named_enum! {
    /// Breakdown requested by `UTILIZATION`
    pub enum UtilizationMode {
        Current => "current",
        Trend => "trend",
        Breakdown => "breakdown",
    }
}

named_enum! {
    /// Rollover report requested by `ROLLOVER`
    pub enum RolloverMode {
        Status => "status",
        History => "history",
        Forecast => "forecast",
    }
}
