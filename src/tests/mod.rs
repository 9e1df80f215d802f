//! Scenario tests for the `suntide` binary: argument handling and whole
//! reports built from saved NOAA responses.
