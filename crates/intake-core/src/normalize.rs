//! Maps the many spellings forms use for a field onto canonical column names.

use crate::record::Record;

/// Fold a field name for alias lookup: lower-case, ASCII alphanumerics only.
fn fold(name: &str) -> String {
  name
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// The canonical column for a folded field name, if it is a known alias.
fn canonical(folded: &str) -> Option<&'static str> {
  let name = match folded {
    "name" | "fullname" | "customername" | "applicantname" => "Name",
    "mobile" | "phone" | "phonenumber" | "mobilenumber" | "mobileno"
    | "contact" | "contactnumber" => "Mobile",
    "email" | "emailaddress" | "emailid" | "mail" => "Email",
    "city" | "town" => "City",
    "state" | "region" => "State",
    "pincode" | "pin" | "zip" | "zipcode" | "postalcode" => "Pincode",
    "loanamount" | "amount" | "loan" | "requestedamount" => "LoanAmount",
    "loantype" | "product" | "loanproduct" => "LoanType",
    "monthlyincome" | "income" | "salary" => "MonthlyIncome",
    "employmenttype" | "employment" | "occupation" => "EmploymentType",
    "pan" | "pannumber" | "pancard" => "PAN",
    "dob" | "dateofbirth" | "birthdate" => "DateOfBirth",
    "message" | "comments" | "remarks" | "notes" => "Message",
    _ => return None,
  };
  Some(name)
}

/// Rename every field of `input` to its canonical column.
///
/// Unknown fields keep their (trimmed) name; empty names are dropped. When
/// two inputs land on one column, the first non-blank value wins.
pub fn normalize(input: &Record) -> Record {
  let mut out = Record::new();
  for (name, value) in input.iter() {
    let trimmed = name.trim();
    if trimmed.is_empty() {
      continue;
    }
    let column = canonical(&fold(trimmed)).unwrap_or(trimmed);
    match out.get(column) {
      Some(existing) if !existing.is_blank() => {}
      _ => out.insert(column, value.clone()),
    }
  }
  out
}
