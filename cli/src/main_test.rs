use super::*;

#[test]
fn ws_url_swaps_scheme_and_appends_path() {
    assert_eq!(ws_url("http://127.0.0.1:3001").unwrap(), "ws://127.0.0.1:3001/ws");
    assert_eq!(ws_url("https://sketch.example.com/").unwrap(), "wss://sketch.example.com/ws");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://host"), Err(CliError::InvalidBaseUrl(_))));
    assert!(matches!(ws_url("127.0.0.1:3001"), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn cli_parses_draw_with_defaults() {
    let cli = Cli::try_parse_from(["sketch-cli", "draw", "--room", "r1"]).unwrap();
    let Command::Draw(args) = cli.command else {
        panic!("expected draw");
    };
    assert_eq!(args.room.room, "r1");
    assert!(!args.room.create);
    assert_eq!(args.input, "-");
    assert_eq!(args.linger_ms, 250);
}

#[test]
fn cli_parses_user_color() {
    let cli = Cli::try_parse_from(["sketch-cli", "--user-color", "#00ff00", "rooms"]).unwrap();
    assert_eq!(cli.user_color, Rgb::new(0, 0xff, 0));
    assert!(matches!(cli.command, Command::Rooms));
}
