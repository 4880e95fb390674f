mod soap_collector_tests;
