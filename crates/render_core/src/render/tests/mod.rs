//! Whole-frame tests driven through the headless backend
