//! Stamps build metadata shown by `aobake --version`.

use time::format_description::{self, FormatItem};
use time::OffsetDateTime;

fn stamp(var: &str, now: OffsetDateTime, fmt: &[FormatItem<'_>]) -> String {
    println!("cargo:rerun-if-env-changed={var}");
    std::env::var(var).unwrap_or_else(|_| now.format(fmt).unwrap_or_else(|_| "unknown".to_string()))
}

fn main() {
    let now = OffsetDateTime::now_utc();
    let date_fmt = format_description::parse("[year]-[month]-[day]").expect("valid date format");
    let time_fmt = format_description::parse("[hour]:[minute]:[second]").expect("valid time format");

    let date = stamp("AOBAKE_BUILD_DATE", now, &date_fmt);
    let time = stamp("AOBAKE_BUILD_TIME", now, &time_fmt);
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=AOBAKE_BUILD_DATE={date}");
    println!("cargo:rustc-env=AOBAKE_BUILD_TIME={time}");
    println!("cargo:rustc-env=AOBAKE_BUILD_TARGET={target}");
}
