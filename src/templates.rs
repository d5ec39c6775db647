//! Page templates, compiled into the binary.
//!
//! Sources live under `templates/` and are embedded with `include_str!`, so
//! the server has no runtime dependency on the working directory. minijinja
//! auto-escapes every `.html` template.

use minijinja::{Environment, Value};

/// `(name, source)` for every template the routes render or extend.
const SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("home-anon.html", include_str!("../templates/home-anon.html")),
    ("404.html", include_str!("../templates/404.html")),
    ("users/signup.html", include_str!("../templates/users/signup.html")),
    ("users/login.html", include_str!("../templates/users/login.html")),
    ("users/edit.html", include_str!("../templates/users/edit.html")),
    ("users/index.html", include_str!("../templates/users/index.html")),
    ("users/detail.html", include_str!("../templates/users/detail.html")),
    ("users/show.html", include_str!("../templates/users/show.html")),
    ("users/likes.html", include_str!("../templates/users/likes.html")),
    ("users/following.html", include_str!("../templates/users/following.html")),
    ("users/followers.html", include_str!("../templates/users/followers.html")),
    ("messages/new.html", include_str!("../templates/messages/new.html")),
    ("messages/show.html", include_str!("../templates/messages/show.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Parse every template up front so syntax errors fail at startup.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in SOURCES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
