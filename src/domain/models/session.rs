use strum::EnumIter;
use strum::EnumVariantNames;

/// Selects which provider operation handles the next submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Image,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Pending,
    Errored,
}
