#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Names,Cuisine,Price_For_Two,Signature_Dishes,Special_Features,More_Info,Ratings,Location,latitude,longitude";

/// A small catalog around MG Road, Bengaluru, plus one place in Delhi
pub const ROWS: &[&str] = &[
  "Pizza Palace,\"Italian, Pizza\",450,Margherita Pizza,Outdoor Seating,Perfect for a date night,4.2,Indiranagar,12.9719,77.6412",
  "Trattoria Roma,Italian,480,Lasagna,Live Music,Romantic dinner and date spot,4.6,Church Street,12.9750,77.6050",
  "Slice of Naples,\"Pizza, Italian\",350,Pepperoni Pizza,Takeaway,Quick bites,4.0,Koramangala,12.9352,77.6245",
  "Dragon Bowl,Chinese,300,Dim Sum,,Family friendly,4.9,MG Road,12.9740,77.6090",
  "Capital Curry,North Indian,600,Butter Chicken,,Date night,4.7,Connaught Place,28.6315,77.2167",
  "Nowhere Cafe,Cafe,200,Cold Coffee,,Work friendly,3.9,Unknown,,",
];

pub const MG_ROAD: (f64, f64) = (12.9756, 77.6066);

pub fn catalog_csv() -> String {
  format!("{HEADER}\n{}\n", ROWS.join("\n"))
}

pub fn write_catalog(dir: &Path) -> PathBuf {
  let path = dir.join("restaurants.csv");
  fs::write(&path, catalog_csv()).unwrap();
  path
}
