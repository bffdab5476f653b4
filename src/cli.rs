//! Command line flags
//!
//! Every value is optional here; defaults live in the configuration layer so
//! a config file or environment variable is only overridden by flags that
//! were actually given.

use clap::Parser;

const REDIRECT_HELP: &str = "\
Dynamic redirect (--redirect):
  /redir/<required_method>/<base64_redirect>
  /redir/<required_method>/<status_code>/<base64_redirect>
  /redir?method=<required_method>&status=<status_code>&redir=<redirect>

  required_method: The method required to activate the redirect. Use * for any method.
  status_code:     The redirect status code to use. Must be in the range of 300-399.
                   Status code 307 is the default.
  base64_redirect: The target URL, base64 encoded with the URL-safe alphabet.

  Requests with any other method get 200 \"Success\" instead of a redirect.

Examples:
  /redir/POST/aHR0cHM6Ly9nb29nbGUuY29t
      Redirects POST requests to https://google.com
  /redir/*/303/aHR0cHM6Ly9nb29nbGUuY29t
      Redirects any request to https://google.com using the 303 status code
  /redir?method=*&status=302&redir=https://google.com
      Redirects any request to https://google.com using the 302 status code";

#[derive(Debug, Parser)]
#[command(name = "dirserve", version, about = "Serve a directory over HTTP, with optional dynamic redirects")]
#[command(after_long_help = REDIRECT_HELP)]
pub struct Cli {
    /// The port to listen on [default: 8000]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// The address to listen on [default: 0.0.0.0]
    #[arg(short = 'l', long = "listen", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// The directory where the files are served [default: .]
    #[arg(short = 'd', long, value_name = "DIR")]
    pub directory: Option<String>,

    /// Enable CORS
    #[arg(long)]
    pub cors: bool,

    /// Enable verbose logging. Logs out the request headers and body
    #[arg(long)]
    pub verbose: bool,

    /// Enable dynamic redirect (see --help for the URL format)
    #[arg(long)]
    pub redirect: bool,

    /// Configuration file (TOML); dirserve.toml is picked up when present
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["dirserve", "-p", "9000", "-l", "127.0.0.1", "-d", "/srv", "--redirect"]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.listen_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.directory.as_deref(), Some("/srv"));
        assert!(cli.redirect);
        assert!(!cli.cors);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_no_flags() {
        let cli = Cli::parse_from(["dirserve"]);
        assert_eq!(cli.port, None);
        assert!(cli.config.is_none());
        assert!(!cli.print_config);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["dirserve", "-p", "70000"]).is_err());
    }
}
