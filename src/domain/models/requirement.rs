#[cfg(test)]
#[path = "requirement_test.rs"]
mod tests;

/// A structured description of what the user wants advice on, rendered into
/// a single chat prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requirement {
    pub purpose: String,
    pub target: String,
    pub goal: String,
    pub concern: String,
}

impl Requirement {
    pub fn is_complete(&self) -> bool {
        return [&self.purpose, &self.target, &self.goal, &self.concern]
            .iter()
            .all(|field| return !field.trim().is_empty());
    }

    pub fn to_prompt(&self) -> String {
        return format!(
            "I want to {purpose},\nfor use by {target},\nhoping to achieve {goal},\nbut I am concerned about {concern}.\n\nPlease give professional advice and solutions.",
            purpose = self.purpose.trim(),
            target = self.target.trim(),
            goal = self.goal.trim(),
            concern = self.concern.trim(),
        );
    }
}
