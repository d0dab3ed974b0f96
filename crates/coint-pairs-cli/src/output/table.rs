use serde_json::Value;
use tabled::{Table, builder::Builder};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    // Print the result section
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            match val {
                // One level of nesting (e.g. metrics, critical values) is
                // flattened into dotted field names
                Value::Object(inner) => {
                    for (inner_key, inner_val) in inner {
                        builder.push_record([
                            format!("{key}.{inner_key}"),
                            format_value(inner_val),
                        ]);
                    }
                }
                _ => builder.push_record([key.clone(), format_value(val)]),
            }
        }
        let table = Table::from(builder);
        println!("{}", table);
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(format_value)
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        // Simple array of values
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => abbreviate(arr),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Arrays longer than this are shown as head ... tail.
const MAX_INLINE_ITEMS: usize = 8;
const EDGE_ITEMS: usize = 3;

fn abbreviate(arr: &[Value]) -> String {
    if arr.iter().any(Value::is_object) {
        return format!("[{} rows]", arr.len());
    }
    if arr.len() <= MAX_INLINE_ITEMS {
        let items: Vec<String> = arr.iter().map(format_value).collect();
        return items.join(", ");
    }
    let head: Vec<String> = arr[..EDGE_ITEMS].iter().map(format_value).collect();
    let tail: Vec<String> = arr[arr.len() - EDGE_ITEMS..]
        .iter()
        .map(format_value)
        .collect();
    format!(
        "{}, ... , {} ({} items)",
        head.join(", "),
        tail.join(", "),
        arr.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_array_inline() {
        assert_eq!(format_value(&json!([1, 0, -1])), "1, 0, -1");
    }

    #[test]
    fn test_long_array_abbreviated() {
        let v = json!([1, 1, 0, 0, -1, -1, 0, 0, 1, 1]);
        assert_eq!(format_value(&v), "1, 1, 0, ... , 0, 1, 1 (10 items)");
    }

    #[test]
    fn test_array_of_objects_counted() {
        let v = json!([{"date": "2024-01-02"}, {"date": "2024-01-03"}]);
        assert_eq!(format_value(&v), "[2 rows]");
    }
}
