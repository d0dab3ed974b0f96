use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) -> csv::Result<()> {
    let stdout = io::stdout();
    write_csv(stdout.lock(), value)
}

/// A result carrying a per-period table (`periods`) or a position path
/// (`signals`) is written row by row; anything else as field/value pairs.
fn write_csv<W: io::Write>(writer: W, value: &Value) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                if let Some(Value::Array(periods)) = result.get("periods") {
                    write_array_csv(&mut wtr, periods)?;
                } else if let Some(Value::Array(signals)) = result.get("signals") {
                    wtr.write_record(["period", "signal"])?;
                    for (t, s) in signals.iter().enumerate() {
                        wtr.write_record([t.to_string(), format_csv_value(s)])?;
                    }
                } else {
                    write_fields(&mut wtr, result)?;
                }
            } else {
                write_fields(&mut wtr, map)?;
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr)?,
        _ => wtr.write_record([&format_csv_value(value)])?,
    }

    wtr.flush()?;
    Ok(())
}

fn write_fields<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    fields: &serde_json::Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if arr.is_empty() {
        return Ok(());
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    } else {
        for item in arr {
            wtr.write_record([&format_csv_value(item)])?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_period_rows_written_with_headers() {
        let rows = vec![
            json!({"date": "2024-01-02", "z_score": "-1.7", "signal": 1}),
            json!({"date": "2024-01-03", "z_score": "0.2", "signal": 0}),
        ];
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_array_csv(&mut wtr, &rows).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("date") && lines[0].contains("signal"));
        assert!(lines[1].contains("-1.7"));
    }

    /// Accepts every write and fails on flush, like a closed pipe.
    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_failure_is_returned() {
        let value = json!({"result": {"signals": [1, 0, -1]}});
        assert!(write_csv(ClosedPipe, &value).is_err());
    }

    #[test]
    fn test_signals_written_as_period_rows() {
        let value = json!({"result": {"signals": [1, 0, -1]}});
        let mut buf = Vec::new();
        write_csv(&mut buf, &value).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "period,signal\n0,1\n1,0\n2,-1\n");
    }
}
