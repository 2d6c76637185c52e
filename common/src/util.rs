use std::num::NonZeroU64;

/// `hot_path` -> `Hot Path`
pub fn title_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `100_000_000` -> `100M`, `1500` -> `1.5K`
pub fn short_count(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (scale, suffix) in UNITS {
        if count >= scale {
            let whole = count / scale;
            let tenth = (count % scale) * 10 / scale;
            return if tenth == 0 {
                format!("{whole}{suffix}")
            } else {
                format!("{whole}.{tenth}{suffix}")
            };
        }
    }
    count.to_string()
}

/// Panel title of a function, ie. `Hot Path (100M calls)`
pub fn function_title(function: &str, call_count: NonZeroU64) -> String {
    format!(
        "{} ({} calls)",
        title_case(function),
        short_count(call_count.get())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles() {
        assert_eq!(title_case("hot_path"), "Hot Path");
        assert_eq!(title_case("array_ops"), "Array Ops");
        assert_eq!(title_case("memory"), "Memory");
        assert_eq!(
            function_title("recursive", NonZeroU64::new(1_000_000).unwrap()),
            "Recursive (1M calls)"
        );
    }

    #[test]
    fn counts() {
        assert_eq!(short_count(100_000_000), "100M");
        assert_eq!(short_count(100_000), "100K");
        assert_eq!(short_count(1_500), "1.5K");
        assert_eq!(short_count(999), "999");
        assert_eq!(short_count(2_000_000_000), "2B");
    }
}
