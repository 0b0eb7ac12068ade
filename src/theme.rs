use ratatui::style::Color;

/// Colour palette applied to every widget.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub error: Color,
  pub status: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  /// Keyword matches inside titles.
  pub match_fg: Color,
  pub match_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static DARK: Theme = Theme {
  name: "dark",
  bg: Color::Rgb(24, 24, 32),
  fg: Color::Rgb(220, 220, 228),
  accent: Color::Rgb(255, 92, 92),
  muted: Color::Rgb(120, 120, 140),
  border: Color::Rgb(64, 64, 80),
  error: Color::Rgb(255, 120, 100),
  status: Color::Rgb(130, 200, 255),
  highlight_fg: Color::Rgb(255, 255, 255),
  highlight_bg: Color::Rgb(60, 60, 90),
  stripe_bg: Color::Rgb(30, 30, 40),
  match_fg: Color::Rgb(24, 24, 32),
  match_bg: Color::Rgb(255, 214, 90),
  key_fg: Color::Rgb(24, 24, 32),
  key_bg: Color::Rgb(160, 160, 180),
};

pub static LIGHT: Theme = Theme {
  name: "light",
  bg: Color::Rgb(250, 250, 247),
  fg: Color::Rgb(40, 40, 48),
  accent: Color::Rgb(204, 0, 0),
  muted: Color::Rgb(130, 130, 140),
  border: Color::Rgb(200, 200, 205),
  error: Color::Rgb(190, 40, 30),
  status: Color::Rgb(20, 100, 180),
  highlight_fg: Color::Rgb(20, 20, 24),
  highlight_bg: Color::Rgb(222, 230, 245),
  stripe_bg: Color::Rgb(242, 242, 238),
  match_fg: Color::Rgb(20, 20, 24),
  match_bg: Color::Rgb(255, 230, 120),
  key_fg: Color::Rgb(250, 250, 247),
  key_bg: Color::Rgb(90, 90, 100),
};

impl Theme {
  /// Look up a theme by its persisted name; unknown or missing names fall back to dark.
  pub fn by_name(name: Option<&str>) -> &'static Theme {
    match name {
      Some(n) if n.eq_ignore_ascii_case(LIGHT.name) => &LIGHT,
      _ => &DARK,
    }
  }

  pub fn toggled(&self) -> &'static Theme {
    if self.name == LIGHT.name { &DARK } else { &LIGHT }
  }

  pub fn is_dark(&self) -> bool {
    self.name == DARK.name
  }
}
