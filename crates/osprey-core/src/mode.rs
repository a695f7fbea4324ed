/// Coarse overlay/modal classification of the current page.
///
/// Snapshot keys embed the mode so that captures taken across a modal
/// open/close transition are never diffed against each other. Classification
/// is structural (a pure function of the current DOM), never derived from
/// prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageMode {
    /// Ordinary page content, nothing overlaid.
    Base,
    /// A rendered `role=dialog` or native dialog element.
    Dialog,
    /// A large fixed/absolutely positioned element covering the viewport.
    Overlay,
    /// An expanded combobox or visible listbox.
    Dropdown,
}

impl PageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageMode::Base => "base",
            PageMode::Dialog => "dialog",
            PageMode::Overlay => "overlay",
            PageMode::Dropdown => "dropdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "base" => Some(PageMode::Base),
            "dialog" => Some(PageMode::Dialog),
            "overlay" => Some(PageMode::Overlay),
            "dropdown" => Some(PageMode::Dropdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for PageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
