use crate::models::Session;

/// Top-level destinations, gated by session and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Genres,
    Search,
    Create,
    MyBlogs,
    Admin,
    Login,
    Register,
    Logout,
}

impl NavItem {
    pub fn label(self) -> &'static str {
        match self {
            NavItem::Home => "Home",
            NavItem::Genres => "Genres",
            NavItem::Search => "Search",
            NavItem::Create => "Create Blog",
            NavItem::MyBlogs => "My Blogs",
            NavItem::Admin => "Admin",
            NavItem::Login => "Login",
            NavItem::Register => "Register",
            NavItem::Logout => "Logout",
        }
    }
}

pub fn navigation(session: Option<&Session>) -> Vec<NavItem> {
    let mut items = vec![NavItem::Home, NavItem::Genres, NavItem::Search];
    match session {
        None => {
            items.push(NavItem::Login);
            items.push(NavItem::Register);
        }
        Some(s) => {
            items.push(NavItem::Create);
            items.push(NavItem::MyBlogs);
            if s.is_admin() {
                items.push(NavItem::Admin);
            }
            items.push(NavItem::Logout);
        }
    }
    items
}

/// Where to go right after signing in.
pub fn landing_after_login(session: &Session) -> NavItem {
    if session.is_admin() {
        NavItem::Admin
    } else {
        NavItem::Home
    }
}
