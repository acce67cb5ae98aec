//! Prometheus text exposition format.
//!
//! ```
//! # use build_exporter::collector::{MetricFamilySamples, Sample};
//! # use build_exporter::encoding::text::encode;
//! # use build_exporter::metrics::MetricType;
//! let families = vec![MetricFamilySamples::new(
//!     "ci_jenkins_up",
//!     "Is the host ready to receive requests.",
//!     MetricType::Gauge,
//!     vec![Sample::new("ci_jenkins_up".to_string(), vec![], 1.0)],
//! )];
//!
//! let mut buffer = String::new();
//! encode(&mut buffer, &families).unwrap();
//!
//! let expected = "# HELP ci_jenkins_up Is the host ready to receive requests.\n".to_owned()
//!     + "# TYPE ci_jenkins_up gauge\n"
//!     + "ci_jenkins_up 1\n";
//! assert_eq!(expected, buffer);
//! ```

use std::fmt::Write;

use crate::collector::{MetricFamilySamples, Sample};

/// Encode the given metric families into the text format.
pub fn encode<W>(writer: &mut W, families: &[MetricFamilySamples]) -> Result<(), std::fmt::Error>
where
    W: Write,
{
    for family in families {
        writer.write_str("# HELP ")?;
        writer.write_str(family.name())?;
        writer.write_str(" ")?;
        encode_help(writer, family.help())?;
        writer.write_str("\n")?;

        writer.write_str("# TYPE ")?;
        writer.write_str(family.name())?;
        writer.write_str(" ")?;
        writer.write_str(family.metric_type().as_str())?;
        writer.write_str("\n")?;

        for sample in family.samples() {
            encode_sample(writer, sample)?;
        }
    }

    Ok(())
}

fn encode_sample<W: Write>(writer: &mut W, sample: &Sample) -> Result<(), std::fmt::Error> {
    writer.write_str(sample.name())?;

    if !sample.labels().is_empty() {
        writer.write_str("{")?;
        for (i, (name, value)) in sample.labels().iter().enumerate() {
            if i > 0 {
                writer.write_str(",")?;
            }
            writer.write_str(name)?;
            writer.write_str("=\"")?;
            encode_label_value(writer, value)?;
            writer.write_str("\"")?;
        }
        writer.write_str("}")?;
    }

    writer.write_str(" ")?;
    encode_value(writer, sample.value())?;
    writer.write_str("\n")
}

fn encode_help<W: Write>(writer: &mut W, help: &str) -> Result<(), std::fmt::Error> {
    for c in help.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}

fn encode_label_value<W: Write>(writer: &mut W, value: &str) -> Result<(), std::fmt::Error> {
    for c in value.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '"' => writer.write_str("\\\"")?,
            '\n' => writer.write_str("\\n")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}

fn encode_value<W: Write>(writer: &mut W, value: f64) -> Result<(), std::fmt::Error> {
    if value.is_nan() {
        return writer.write_str("NaN");
    }
    if value.is_infinite() {
        return writer.write_str(if value > 0.0 { "+Inf" } else { "-Inf" });
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return writer.write_str(itoa::Buffer::new().format(value as i64));
    }
    writer.write_str(dtoa::Buffer::new().format(value))
}
