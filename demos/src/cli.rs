//! Command-line interface definitions using clap derive API.

use clap::Parser;

/// Train a TRPO policy on the DXL reacher while plotting the learning curve.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "dxl_reacher")]
pub struct Args {
    /// Serial device of the Dynamixel bus (simulated servo when omitted)
    #[arg(long)]
    pub port: Option<String>,

    /// Servo id on the bus
    #[arg(long, default_value_t = 1)]
    pub id: i32,

    /// Bus baud rate
    #[arg(long, default_value_t = 1_000_000)]
    pub baud: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["dxl_reacher"]);
        assert_eq!(args.port, None);
        assert_eq!(args.id, 1);
        assert_eq!(args.baud, 1_000_000);
    }

    #[test]
    fn test_all_flags() {
        let args = Args::parse_from(["dxl_reacher", "--port", "/dev/ttyUSB0", "--id", "3", "--baud", "57600"]);
        assert_eq!(args.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(args.id, 3);
        assert_eq!(args.baud, 57_600);
    }

    #[test]
    fn test_rejects_unknown_flag() {
        assert!(Args::try_parse_from(["dxl_reacher", "--episodes", "3"]).is_err());
    }

    #[test]
    fn test_has_no_version_flag() {
        let err = Args::try_parse_from(["dxl_reacher", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert!(Args::try_parse_from(["dxl_reacher", "-V"]).is_err());
    }
}
