pub mod documentmodel;
pub mod reportmodel;
pub mod requestmodel;
pub mod reviewmodel;
pub mod servicemodel;
pub mod usermodel;
