//! Walkthrough of the basic scalar types: integers, floats, strings and
//! booleans, printed as `type value` pairs.

use std::any::type_name_of_val;
use std::fmt::Display;

pub struct Section {
    pub title: &'static str,
    pub lines: Vec<String>,
}

fn describe<T: Display + ?Sized>(value: &T) -> String {
    format!("{} {}", type_name_of_val(value), value)
}

/// `Debug` keeps the fractional part of whole floats (`-10.0`, not `-10`).
fn describe_float(value: f64) -> String {
    format!("{} {:?}", type_name_of_val(&value), value)
}

#[allow(clippy::approx_constant)]
pub fn walkthrough() -> Vec<Section> {
    let int1 = 10;
    let int2 = -10;
    let int3 = 0;

    let float1: f64 = 3.14;
    let float2: f64 = -10.0;
    let float3: f64 = 0.0;

    let str1 = "hello";
    let str2 = "你好";
    let str3 = "666";

    // true counts as 1, false as 0
    let bool1 = true;
    let bool2 = false;

    vec![
        Section {
            title: "integers",
            lines: vec![describe(&int1), describe(&int2), describe(&int3)],
        },
        Section {
            title: "floats",
            lines: vec![
                describe_float(float1),
                describe_float(float2),
                describe_float(float3),
            ],
        },
        Section {
            title: "strings",
            lines: vec![describe(str1), describe(str2), describe(str3)],
        },
        Section {
            title: "booleans",
            lines: vec![
                describe(&bool1),
                describe(&bool2),
                format!("1 + {} = {}", bool1, 1 + i32::from(bool1)),
            ],
        },
    ]
}

pub fn print_walkthrough() {
    for section in walkthrough() {
        println!("# {}", section.title);
        for line in &section.lines {
            println!("  {}", line);
        }
    }
}
